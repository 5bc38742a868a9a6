//! Breakdowns for the smaller dumps: pools, tags, aliases, implications, wiki

use super::{bool_label, key, text_label, Dimension, Keys};
use crate::csv::Record;
use crate::error::Result;

pub fn pool_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::counter("e621_pools_by_category", "Pools per category", &["category"], by_category),
        Dimension::counter("e621_pools_by_active", "Pools per active flag", &["is_active"], |record| {
            Ok(key([bool_label(record.flag("is_active"))]))
        }),
        Dimension::counter(
            "e621_pool_posts_sum",
            "Posts contained in pools per category",
            &["category"],
            by_category,
        )
        .summing(|record| pool_size(record.field("post_ids")) as f64),
    ]
}

pub fn tag_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::counter("e621_tags_by_category", "Tags per category", &["category"], by_tag_category),
        Dimension::counter(
            "e621_tag_post_count_sum",
            "Tagged posts per tag category",
            &["category"],
            by_tag_category,
        )
        .summing(|record| record.number("post_count")),
    ]
}

pub fn alias_dimensions() -> Vec<Dimension> {
    vec![Dimension::counter(
        "e621_tag_aliases_by_status",
        "Tag aliases per status",
        &["status"],
        by_status,
    )]
}

pub fn implication_dimensions() -> Vec<Dimension> {
    vec![Dimension::counter(
        "e621_tag_implications_by_status",
        "Tag implications per status",
        &["status"],
        by_status,
    )]
}

pub fn wiki_dimensions() -> Vec<Dimension> {
    vec![Dimension::counter(
        "e621_wiki_pages_by_locked",
        "Wiki pages per locked flag",
        &["is_locked"],
        |record| Ok(key([bool_label(record.flag("is_locked"))])),
    )]
}

/// Number of ids in a pool's `post_ids`, either `1,2,3` or `{1,2,3}`
pub fn pool_size(post_ids: &str) -> usize {
    post_ids
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter(|id| !id.trim().is_empty())
        .count()
}

/// Name of a numeric tag category; unrecognized values are kept as-is
pub fn tag_category_name(raw: &str) -> String {
    match raw.trim() {
        "0" => "general".to_string(),
        "1" => "artist".to_string(),
        "2" => "contributor".to_string(),
        "3" => "copyright".to_string(),
        "4" => "character".to_string(),
        "5" => "species".to_string(),
        "6" => "invalid".to_string(),
        "7" => "meta".to_string(),
        "8" => "lore".to_string(),
        other => text_label(other),
    }
}

fn by_category(record: &Record) -> Result<Keys> {
    Ok(key([text_label(record.field("category"))]))
}

fn by_tag_category(record: &Record) -> Result<Keys> {
    Ok(key([tag_category_name(record.field("category"))]))
}

fn by_status(record: &Record) -> Result<Keys> {
    Ok(key([text_label(record.field("status"))]))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::record;
    use super::super::DatasetAggregator;
    use super::*;
    use crate::dataset::DatasetType;

    #[test]
    fn test_pool_size_formats() {
        assert_eq!(pool_size("1,2,3"), 3);
        assert_eq!(pool_size("{10,20}"), 2);
        assert_eq!(pool_size("{}"), 0);
        assert_eq!(pool_size(""), 0);
    }

    #[test]
    fn test_pool_breakdowns() {
        let mut agg = DatasetAggregator::new(DatasetType::Pools, pool_dimensions());
        agg.fold(&record(&[("category", "series"), ("is_active", "t"), ("post_ids", "{1,2,3}")]))
            .unwrap();
        agg.fold(&record(&[("category", "series"), ("is_active", "f"), ("post_ids", "4")])).unwrap();
        agg.fold(&record(&[("category", ""), ("is_active", "f"), ("post_ids", "")])).unwrap();

        let families = agg.into_families();
        assert_eq!(families[0].get(&["series"]), Some(2.0));
        assert_eq!(families[0].get(&["unknown"]), Some(1.0));
        assert_eq!(families[1].get(&["false"]), Some(2.0));
        assert_eq!(families[2].get(&["series"]), Some(4.0));
    }

    #[test]
    fn test_tag_categories_and_post_counts() {
        let mut agg = DatasetAggregator::new(DatasetType::Tags, tag_dimensions());
        agg.fold(&record(&[("category", "1"), ("post_count", "120")])).unwrap();
        agg.fold(&record(&[("category", "1"), ("post_count", "30")])).unwrap();
        agg.fold(&record(&[("category", "42"), ("post_count", "x")])).unwrap();

        let families = agg.into_families();
        assert_eq!(families[0].get(&["artist"]), Some(2.0));
        assert_eq!(families[0].get(&["42"]), Some(1.0));
        assert_eq!(families[1].get(&["artist"]), Some(150.0));
        assert_eq!(families[1].get(&["42"]), Some(0.0));
    }

    #[test]
    fn test_status_and_locked_breakdowns() {
        let mut aliases = DatasetAggregator::new(DatasetType::TagAliases, alias_dimensions());
        aliases.fold(&record(&[("status", "active")])).unwrap();
        aliases.fold(&record(&[("status", " pending ")])).unwrap();
        assert_eq!(aliases.into_families()[0].get(&["pending"]), Some(1.0));

        let mut wiki = DatasetAggregator::new(DatasetType::WikiPages, wiki_dimensions());
        wiki.fold(&record(&[("is_locked", "TRUE")])).unwrap();
        wiki.fold(&record(&[("is_locked", "")])).unwrap();
        let families = wiki.into_families();
        assert_eq!(families[0].get(&["true"]), Some(1.0));
        assert_eq!(families[0].get(&["false"]), Some(1.0));
    }
}
