//! Records must not depend on where the input was split into chunks

use dumpstat_ingest::csv::{Record, RecordDecoder, RecordReader};
use proptest::prelude::*;
use proptest::sample::Index;

fn encode_field(field: &str) -> String {
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn encode(rows: &[Vec<String>]) -> Vec<u8> {
    let mut text = String::from("a,b,c\n");
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| encode_field(f)).collect();
        text.push_str(&line.join(","));
        text.push('\n');
    }
    text.into_bytes()
}

fn decode_chunks(chunks: &[&[u8]]) -> Vec<Vec<String>> {
    let mut decoder = RecordDecoder::new();
    let mut rows = Vec::new();
    for chunk in chunks {
        decoder.push(chunk);
        while let Some(record) = decoder.next_record() {
            rows.push(record.values().to_vec());
        }
    }
    decoder.finish();
    while let Some(record) = decoder.next_record() {
        rows.push(record.values().to_vec());
    }
    rows
}

fn split_at<'a>(data: &'a [u8], cuts: &[Index]) -> Vec<&'a [u8]> {
    let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(data.len() + 1)).collect();
    offsets.push(0);
    offsets.push(data.len());
    offsets.sort_unstable();
    offsets.dedup();
    offsets.windows(2).map(|w| &data[w[0]..w[1]]).collect()
}

fn rows_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-z0-9 ,\"é\u{3042}]{0,10}", 3), 1..30)
}

proptest! {
    #[test]
    fn chunk_boundaries_do_not_change_records(
        rows in rows_strategy(),
        cuts in prop::collection::vec(any::<Index>(), 0..16),
    ) {
        let data = encode(&rows);
        let whole = decode_chunks(&[&data]);
        let chunked = decode_chunks(&split_at(&data, &cuts));

        prop_assert_eq!(&whole, &rows);
        prop_assert_eq!(chunked, whole);
    }
}

#[tokio::test]
async fn reader_matches_decoder_for_every_chunk_size() {
    let rows: Vec<Vec<String>> = (0..40)
        .map(|i| vec![i.to_string(), format!("tag {i}, \"quoted\""), "\u{3042}".repeat(i % 4)])
        .collect();
    let data = encode(&rows);

    for chunk_size in [1, 2, 3, 7, 64, 4096] {
        let mut reader = RecordReader::with_chunk_size(data.as_slice(), chunk_size);
        let mut decoded: Vec<Record> = Vec::new();
        while let Some(record) = reader.next_record().await.unwrap() {
            decoded.push(record);
        }

        let values: Vec<Vec<String>> = decoded.iter().map(|r| r.values().to_vec()).collect();
        assert_eq!(values, rows, "chunk size {}", chunk_size);
    }
}
