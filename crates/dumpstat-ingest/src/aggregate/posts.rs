//! Post breakdowns

use super::{bool_label, classify_extension, key, source_domain, Dimension, Keys, MediaCategory};
use crate::csv::Record;
use crate::error::Result;

/// Ratings a post can carry: safe, questionable, explicit
pub const RATINGS: [&str; 3] = ["s", "q", "e"];

/// Label for an empty or unrecognized rating
pub const UNKNOWN_RATING: &str = "unknown";

pub fn dimensions(tag_threshold: u64, source_threshold: u64) -> Vec<Dimension> {
    vec![
        Dimension::counter("e621_posts_total", "Total number of posts", &[], total),
        Dimension::counter("e621_posts_by_rating", "Posts per rating", &["rating"], by_rating),
        Dimension::counter("e621_posts_by_status", "Posts per moderation status", &["status"], by_status),
        Dimension::counter(
            "e621_posts_by_resolution",
            "Posts per resolution and media type",
            &["resolution", "is_gif", "is_video", "is_image", "is_flash"],
            by_resolution,
        ),
        Dimension::counter(
            "e621_posts_by_file_ext",
            "Posts per file extension",
            &["extension", "category"],
            by_file_ext,
        ),
        Dimension::counter("e621_posts_by_tag", "Posts per tag", &["tag"], by_tag)
            .min_count(tag_threshold),
        Dimension::counter(
            "e621_posts_by_source_domain",
            "Posts per source domain",
            &["domain"],
            by_source_domain,
        )
        .min_count(source_threshold),
        Dimension::counter("e621_posts_score_sum", "Sum of post scores per rating", &["rating"], by_rating)
            .summing(|record| record.number("score")),
        Dimension::counter(
            "e621_posts_fav_count_sum",
            "Sum of post favorites per rating",
            &["rating"],
            by_rating,
        )
        .summing(|record| record.number("fav_count")),
    ]
}

/// The post's rating; anything outside s/q/e becomes [`UNKNOWN_RATING`]
pub fn rating(record: &Record) -> &'static str {
    let raw = record.field("rating").trim();
    RATINGS
        .iter()
        .copied()
        .find(|r| r.eq_ignore_ascii_case(raw))
        .unwrap_or(UNKNOWN_RATING)
}

/// Moderation status; deletion wins over flags, flags over pending
pub fn status(record: &Record) -> &'static str {
    if record.flag("is_deleted") {
        "deleted"
    } else if record.flag("is_flagged") {
        "flagged"
    } else if record.flag("is_pending") {
        "pending"
    } else {
        "active"
    }
}

fn total(_: &Record) -> Result<Keys> {
    Ok(vec![Vec::new()])
}

fn by_rating(record: &Record) -> Result<Keys> {
    Ok(key([rating(record)]))
}

fn by_status(record: &Record) -> Result<Keys> {
    Ok(key([status(record)]))
}

fn by_resolution(record: &Record) -> Result<Keys> {
    let width = record.number("image_width").max(0.0) as u64;
    let height = record.number("image_height").max(0.0) as u64;
    let media = classify_extension(record.field("file_ext"));

    Ok(key([
        format!("{}x{}", width, height),
        bool_label(media.is_gif()).to_string(),
        bool_label(media.category == MediaCategory::Video).to_string(),
        bool_label(media.category == MediaCategory::Image).to_string(),
        bool_label(media.category == MediaCategory::Flash).to_string(),
    ]))
}

fn by_file_ext(record: &Record) -> Result<Keys> {
    let media = classify_extension(record.field("file_ext"));
    Ok(key([media.extension, media.category.to_string()]))
}

fn by_tag(record: &Record) -> Result<Keys> {
    Ok(record
        .field("tag_string")
        .split_whitespace()
        .map(|tag| vec![tag.to_string()])
        .collect())
}

fn by_source_domain(record: &Record) -> Result<Keys> {
    // Multiple sources are newline separated; the first one is the primary.
    let primary = record.field("source").lines().next().unwrap_or("");
    Ok(key([source_domain(primary)]))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::record;
    use super::super::DatasetAggregator;
    use super::*;
    use crate::dataset::DatasetType;

    fn post(rating: &str) -> Record {
        record(&[
            ("id", "1"),
            ("rating", rating),
            ("source", "https://www.furaffinity.net/view/1"),
            ("image_width", "1920"),
            ("image_height", "1080"),
            ("tag_string", "canine solo"),
            ("fav_count", "10"),
            ("file_ext", "png"),
            ("is_deleted", "f"),
            ("is_pending", "f"),
            ("is_flagged", "f"),
            ("score", "5"),
        ])
    }

    fn aggregate(posts: &[Record]) -> Vec<crate::sink::MetricFamily> {
        let mut agg = DatasetAggregator::new(DatasetType::Posts, dimensions(1, 1));
        for post in posts {
            let _ = agg.fold(post);
        }
        agg.into_families()
    }

    fn family<'a>(
        families: &'a [crate::sink::MetricFamily],
        name: &str,
    ) -> &'a crate::sink::MetricFamily {
        families.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_rating_counts_are_exact_and_absent_ratings_omitted() {
        let mut posts = Vec::new();
        posts.extend((0..4).map(|_| post("s")));
        posts.extend((0..2).map(|_| post("e")));

        let families = aggregate(&posts);
        let by_rating = family(&families, "e621_posts_by_rating");

        assert_eq!(by_rating.get(&["s"]), Some(4.0));
        assert_eq!(by_rating.get(&["e"]), Some(2.0));
        assert_eq!(by_rating.get(&["q"]), None);
        assert_eq!(family(&families, "e621_posts_total").get(&[]), Some(6.0));
    }

    #[test]
    fn test_unexpected_rating_still_counts_the_post() {
        let mut agg = DatasetAggregator::new(DatasetType::Posts, dimensions(1, 1));
        agg.fold(&post("s")).unwrap();
        agg.fold(&post("x")).unwrap();
        agg.fold(&record(&[
            ("rating", ""),
            ("tag_string", "fox"),
            ("source", "https://x.example.com/a"),
        ]))
        .unwrap();

        let families = agg.into_families();
        assert_eq!(family(&families, "e621_posts_total").get(&[]), Some(3.0));
        assert_eq!(family(&families, "e621_posts_by_tag").get(&["solo"]), Some(2.0));
        assert_eq!(family(&families, "e621_posts_by_tag").get(&["fox"]), Some(1.0));
        assert_eq!(
            family(&families, "e621_posts_by_source_domain").get(&["example.com"]),
            Some(1.0)
        );

        let by_rating = family(&families, "e621_posts_by_rating");
        assert_eq!(by_rating.get(&["s"]), Some(1.0));
        assert_eq!(by_rating.get(&["unknown"]), Some(2.0));
        assert_eq!(by_rating.get(&["q"]), None);
    }

    #[test]
    fn test_rating_is_case_insensitive() {
        assert_eq!(rating(&record(&[("rating", " E ")])), "e");
        assert_eq!(rating(&record(&[])), UNKNOWN_RATING);
    }

    #[test]
    fn test_status_precedence() {
        let flagged_and_deleted = record(&[("is_deleted", "t"), ("is_flagged", "true")]);
        assert_eq!(status(&flagged_and_deleted), "deleted");
        assert_eq!(status(&record(&[("is_flagged", "T"), ("is_pending", "t")])), "flagged");
        assert_eq!(status(&record(&[("is_pending", "t")])), "pending");
        assert_eq!(status(&record(&[])), "active");
    }

    #[test]
    fn test_resolution_and_media_labels() {
        let families = aggregate(&[post("q")]);
        let resolution = family(&families, "e621_posts_by_resolution");
        assert_eq!(resolution.get(&["1920x1080", "false", "false", "true", "false"]), Some(1.0));

        let ext = family(&families, "e621_posts_by_file_ext");
        assert_eq!(ext.get(&["png", "image"]), Some(1.0));
    }

    #[test]
    fn test_sums_and_domains() {
        let families = aggregate(&[post("s"), post("s")]);
        assert_eq!(family(&families, "e621_posts_score_sum").get(&["s"]), Some(10.0));
        assert_eq!(family(&families, "e621_posts_fav_count_sum").get(&["s"]), Some(20.0));
        assert_eq!(
            family(&families, "e621_posts_by_source_domain").get(&["furaffinity.net"]),
            Some(2.0)
        );
    }

    #[test]
    fn test_tag_threshold() {
        let mut agg = DatasetAggregator::new(DatasetType::Posts, dimensions(2, 1));
        agg.fold(&post("s")).unwrap();
        agg.fold(&record(&[("rating", "s"), ("tag_string", "canine")])).unwrap();

        let families = agg.into_families();
        let by_tag = family(&families, "e621_posts_by_tag");
        assert_eq!(by_tag.get(&["canine"]), Some(2.0));
        assert_eq!(by_tag.get(&["solo"]), None);
    }
}
