use std::fs::File;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::models::InteractionRow;

/// Read an interaction feed from CSV. Expected header:
/// `user_id,item_id,view_count,buy_count,rating` — the rating column may be
/// empty per row. Column order is taken from the header, not assumed.
pub fn read_csv(path: &Path) -> Result<Vec<InteractionRow>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::Feed(format!("file not found: {}", path.display()))
        } else {
            e.into()
        }
    })?;
    read_csv_from(file)
}

pub fn read_csv_from<R: std::io::Read>(reader: R) -> Result<Vec<InteractionRow>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EngineError::Feed(format!("missing column: {name}")))
    };
    let user_col = column("user_id")?;
    let item_col = column("item_id")?;
    let view_col = column("view_count")?;
    let buy_col = column("buy_count")?;
    let rating_col = column("rating")?;

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |col: usize| record.get(col).unwrap_or("").trim();

        let parse_f32 = |col: usize, name: &str| -> Result<f32> {
            let raw = field(col);
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f32>().map_err(|e| {
                EngineError::Feed(format!("record {} ({name}): {e}", line + 1))
            })
        };

        let item_id = field(item_col).parse::<i64>().map_err(|e| {
            EngineError::Feed(format!("record {} (item_id): {e}", line + 1))
        })?;

        let rating_raw = field(rating_col);
        let rating = if rating_raw.is_empty() {
            None
        } else {
            Some(rating_raw.parse::<f32>().map_err(|e| {
                EngineError::Feed(format!("record {} (rating): {e}", line + 1))
            })?)
        };

        rows.push(InteractionRow {
            user_id: field(user_col).to_string(),
            item_id,
            view_count: parse_f32(view_col, "view_count")?,
            buy_count: parse_f32(buy_col, "buy_count")?,
            rating,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_with_optional_rating() {
        let data = "\
user_id,item_id,view_count,buy_count,rating
alice,101,5,0,
bob,103,0,0,5.0
carol,102,1,2,3.5
";
        let rows = read_csv_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].user_id, "alice");
        assert_eq!(rows[0].rating, None);
        assert_eq!(rows[1].rating, Some(5.0));
        assert_eq!(rows[2].buy_count, 2.0);
    }

    #[test]
    fn header_order_is_not_assumed() {
        let data = "\
rating,item_id,user_id,buy_count,view_count
4.5,7,dave,1,3
";
        let rows = read_csv_from(data.as_bytes()).unwrap();
        assert_eq!(rows[0].user_id, "dave");
        assert_eq!(rows[0].item_id, 7);
        assert_eq!(rows[0].view_count, 3.0);
    }

    #[test]
    fn missing_column_is_a_feed_error() {
        let data = "user_id,item_id\nalice,1\n";
        let err = read_csv_from(data.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::Feed(_)));
    }

    #[test]
    fn bad_number_reports_the_record() {
        let data = "\
user_id,item_id,view_count,buy_count,rating
alice,101,many,0,
";
        let err = read_csv_from(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }
}
