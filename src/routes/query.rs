use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an optional ISO `YYYY-MM-DD` query parameter. Blank means absent.
pub fn parse_query_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, QUERY_DATE_FORMAT)
        .map(Some)
        .map_err(|_| {
            warn!("Rejected {}={}: not a YYYY-MM-DD date", name, raw);
            AppError::Validation(format!("Invalid {}: {}. Expected YYYY-MM-DD", name, raw))
        })
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    pub fn parse(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
        Ok((
            parse_query_date("start_date", self.start_date.as_deref())?,
            parse_query_date("end_date", self.end_date.as_deref())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_date() {
        assert_eq!(
            parse_query_date("start_date", Some("2020-03-01")).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1)
        );
        assert_eq!(parse_query_date("start_date", Some("  ")).unwrap(), None);
        assert_eq!(parse_query_date("start_date", None).unwrap(), None);
        assert!(matches!(
            parse_query_date("end_date", Some("03/01/2020")),
            Err(AppError::Validation(_))
        ));
    }
}
