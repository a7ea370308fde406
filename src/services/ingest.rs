//! Ingestion of the store feeds (ZIP archive, CSV directory or URL)

use std::{
    collections::HashMap,
    io::{Cursor, Read},
    path::Path,
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        ingest::{IngestRequest, IngestSummary},
        store::{BusinessHoursRecord, StoreStatusRecord, StoreTimezoneRecord},
    },
    repository::Repository,
    uptime::StoreStatus,
};

/// Raw CSV contents of each feed, when present in the source
#[derive(Debug, Default)]
pub struct FeedFiles {
    pub store_status: Option<Vec<u8>>,
    pub business_hours: Option<Vec<u8>>,
    pub timezones: Option<Vec<u8>>,
}

impl FeedFiles {
    /// Slot of the feed a CSV file belongs to, if that feed is still empty
    fn slot_for(&mut self, name: &str) -> Option<&mut Option<Vec<u8>>> {
        let name = name.to_ascii_lowercase();
        if !name.ends_with(".csv") {
            return None;
        }
        let slot = if name.contains("store_status") {
            &mut self.store_status
        } else if name.contains("business_hours") || name.contains("menu_hours") {
            &mut self.business_hours
        } else if name.contains("timezone") {
            &mut self.timezones
        } else {
            return None;
        };
        slot.is_none().then_some(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.store_status.is_none() && self.business_hours.is_none() && self.timezones.is_none()
    }

    /// Extract feeds from a ZIP archive
    pub fn from_zip(bytes: Vec<u8>) -> AppResult<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut files = Self::default();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if let Some(slot) = files.slot_for(&name) {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                *slot = Some(buf);
            }
        }
        Ok(files)
    }

    /// Extract a ZIP archive on the blocking pool
    pub async fn from_zip_blocking(bytes: Vec<u8>) -> AppResult<Self> {
        tokio::task::spawn_blocking(move || Self::from_zip(bytes))
            .await
            .map_err(|e| AppError::Internal(format!("archive extraction aborted: {}", e)))?
    }

    /// Collect feeds from a directory of CSV files
    pub async fn from_dir(dir: &Path) -> AppResult<Self> {
        let mut files = Self::default();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(slot) = files.slot_for(&name) {
                *slot = Some(tokio::fs::read(entry.path()).await?);
            }
        }
        Ok(files)
    }

    /// Collect feeds from a local ZIP archive or CSV directory
    pub async fn from_path(source: &str) -> AppResult<Self> {
        let path = Path::new(source);
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::BadRequest(format!("source {} does not exist", source)));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            Self::from_dir(path).await
        } else {
            Self::from_zip_blocking(tokio::fs::read(path).await?).await
        }
    }
}

/// Rows parsed from the feeds, ready to persist
#[derive(Debug, Default)]
pub struct ParsedFeeds {
    pub statuses: Vec<StoreStatusRecord>,
    pub business_hours: Vec<BusinessHoursRecord>,
    pub timezones: Vec<StoreTimezoneRecord>,
    pub summary: IngestSummary,
}

type TimestampParser = fn(&str) -> Option<DateTime<Utc>>;

fn parse_utc_suffixed(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f UTC").ok().map(|t| t.and_utc())
}

fn parse_naive_spaced(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok().map(|t| t.and_utc())
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}

fn parse_naive_iso(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|t| t.and_utc())
}

/// Accepted textual timestamp layouts, tried in order
const TIMESTAMP_PARSERS: [TimestampParser; 4] = [
    parse_utc_suffixed,
    parse_naive_spaced,
    parse_rfc3339,
    parse_naive_iso,
];

/// Parse a UTC timestamp in any accepted layout
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    TIMESTAMP_PARSERS.iter().find_map(|parse| parse(value))
}

/// Header-normalized view over a CSV feed
struct FeedReader {
    columns: HashMap<String, usize>,
    records: Vec<csv::StringRecord>,
}

impl FeedReader {
    fn new(bytes: &[u8]) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_column(h), i))
            .collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, records })
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.columns
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

fn normalize_column(header: &str) -> String {
    let name = header.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
    match name.as_str() {
        "day" | "dayofweek" => "day_of_week".to_string(),
        "timezone" => "timezone_str".to_string(),
        _ => name,
    }
}

/// Parse every feed present, dropping malformed rows
pub fn parse_feeds(files: &FeedFiles) -> AppResult<ParsedFeeds> {
    let mut parsed = ParsedFeeds::default();

    if let Some(bytes) = &files.store_status {
        let feed = FeedReader::new(bytes)?;
        let summary = &mut parsed.summary.store_status;
        for record in &feed.records {
            let store_id = feed.field(record, "store_id");
            let timestamp = parse_timestamp(feed.field(record, "timestamp_utc"));
            let status = feed.field(record, "status").parse::<StoreStatus>().ok();
            match (store_id, timestamp, status) {
                (id, Some(ts), Some(status)) if !id.is_empty() => {
                    parsed.statuses.push(StoreStatusRecord::new(id, ts, status));
                    summary.accepted += 1;
                }
                _ => {
                    tracing::debug!("Dropping status row {:?}", record);
                    summary.skipped += 1;
                }
            }
        }
    }

    if let Some(bytes) = &files.business_hours {
        let feed = FeedReader::new(bytes)?;
        let summary = &mut parsed.summary.business_hours;
        for record in &feed.records {
            let store_id = feed.field(record, "store_id");
            // range and time layout are checked when the report is computed
            let day = feed.field(record, "day_of_week").parse::<i32>().ok();
            match day {
                Some(day_of_week) if !store_id.is_empty() => {
                    parsed.business_hours.push(BusinessHoursRecord {
                        store_id: store_id.to_string(),
                        day_of_week,
                        start_time_local: feed.field(record, "start_time_local").to_string(),
                        end_time_local: feed.field(record, "end_time_local").to_string(),
                    });
                    summary.accepted += 1;
                }
                _ => {
                    tracing::debug!("Dropping business hours row {:?}", record);
                    summary.skipped += 1;
                }
            }
        }
    }

    if let Some(bytes) = &files.timezones {
        let feed = FeedReader::new(bytes)?;
        let summary = &mut parsed.summary.timezones;
        for record in &feed.records {
            let store_id = feed.field(record, "store_id");
            if store_id.is_empty() {
                summary.skipped += 1;
                continue;
            }
            parsed.timezones.push(StoreTimezoneRecord {
                store_id: store_id.to_string(),
                timezone_str: feed.field(record, "timezone_str").to_string(),
            });
            summary.accepted += 1;
        }
    }

    Ok(parsed)
}

/// Parse the feeds on the blocking pool
pub async fn parse_feeds_blocking(files: FeedFiles) -> AppResult<ParsedFeeds> {
    tokio::task::spawn_blocking(move || parse_feeds(&files))
        .await
        .map_err(|e| AppError::Internal(format!("feed parsing aborted: {}", e)))?
}

#[derive(Clone)]
pub struct IngestService {
    repository: Repository,
    http: reqwest::Client,
}

impl IngestService {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the feed files designated by `source`
    pub async fn load_source(&self, source: &str) -> AppResult<FeedFiles> {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            let bytes = self
                .http
                .get(source)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            return FeedFiles::from_zip_blocking(bytes.to_vec()).await;
        }

        FeedFiles::from_path(source).await
    }

    /// Load, parse and persist the feeds of `request.source`
    pub async fn ingest(&self, request: &IngestRequest) -> AppResult<IngestSummary> {
        let files = self.load_source(&request.source).await?;
        if files.is_empty() {
            return Err(AppError::Ingest(format!("no feed CSV found in {}", request.source)));
        }

        let parsed = parse_feeds_blocking(files).await?;
        self.persist(&parsed, request.replace).await?;

        tracing::info!(
            "Ingested {} status rows, {} business hours, {} timezones from {}",
            parsed.summary.store_status.accepted,
            parsed.summary.business_hours.accepted,
            parsed.summary.timezones.accepted,
            request.source
        );

        Ok(parsed.summary)
    }

    /// Write parsed feeds in a single transaction, optionally replacing
    /// the current contents. Nothing is kept when any insert fails.
    pub async fn persist(&self, parsed: &ParsedFeeds, replace: bool) -> AppResult<()> {
        let stores = &self.repository.stores;
        let mut tx = self.repository.pool.begin().await?;

        if replace {
            stores.clear(&mut tx).await?;
        }
        stores.insert_timezones(&mut tx, &parsed.timezones).await?;
        stores.insert_business_hours(&mut tx, &parsed.business_hours).await?;
        stores.insert_statuses(&mut tx, &parsed.statuses).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ingest::FeedSummary;
    use std::io::Write;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = utc("2023-01-22 12:09:39");
        assert_eq!(parse_timestamp("2023-01-22 12:09:39.388884 UTC").map(|t| t.timestamp()), Some(expected.timestamp()));
        assert_eq!(parse_timestamp("2023-01-22 12:09:39 UTC"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-22 12:09:39"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-22T12:09:39Z"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-22T14:09:39+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-22T12:09:39"), Some(expected));
        assert_eq!(parse_timestamp("22/01/2023"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column(" Store_ID "), "store_id");
        assert_eq!(normalize_column("day"), "day_of_week");
        assert_eq!(normalize_column("timezone"), "timezone_str");
        assert_eq!(normalize_column("\u{feff}store_id"), "store_id");
    }

    #[test]
    fn test_parse_feeds_drops_malformed_rows() {
        let files = FeedFiles {
            store_status: Some(
                b"store_id,status,timestamp_utc\n\
                  s1,active,2023-01-22 12:09:39.388884 UTC\n\
                  s1,INACTIVE,2023-01-22 13:00:00 UTC\n\
                  s2,sleeping,2023-01-22 13:00:00 UTC\n\
                  s3,active,yesterday\n\
                  ,active,2023-01-22 13:00:00 UTC\n"
                    .to_vec(),
            ),
            business_hours: Some(
                b"store_id,dayOfWeek,start_time_local,end_time_local\n\
                  s1,0,09:00:00,18:00:00\n\
                  s1,9,09:00:00,18:00:00\n\
                  s1,x,09:00:00,18:00:00\n"
                    .to_vec(),
            ),
            timezones: Some(b"store_id,timezone_str\ns1,America/New_York\n,UTC\n".to_vec()),
        };

        let parsed = parse_feeds(&files).unwrap();
        assert_eq!(parsed.summary.store_status, FeedSummary { accepted: 2, skipped: 3 });
        assert_eq!(parsed.statuses[1].status, "inactive");

        // out-of-range weekdays are kept for the report to reject
        assert_eq!(parsed.summary.business_hours, FeedSummary { accepted: 2, skipped: 1 });
        assert_eq!(parsed.business_hours[1].day_of_week, 9);

        assert_eq!(parsed.summary.timezones.total(), 2);
        assert_eq!(parsed.timezones[0].timezone_str, "America/New_York");
    }

    #[test]
    fn test_feed_files_from_zip() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("data/store_status.csv", options).unwrap();
            zip.write_all(b"store_id,status,timestamp_utc\ns1,active,2023-01-22 12:00:00 UTC\n")
                .unwrap();
            zip.start_file("data/Menu_hours.csv", options).unwrap();
            zip.write_all(b"store_id,day,start_time_local,end_time_local\n").unwrap();
            zip.start_file("README.txt", options).unwrap();
            zip.write_all(b"ignored").unwrap();
            zip.finish().unwrap();
        }

        let files = FeedFiles::from_zip(buf.into_inner()).unwrap();
        assert!(files.store_status.is_some());
        assert!(files.business_hours.is_some());
        assert!(files.timezones.is_none());
    }

    #[tokio::test]
    async fn test_feed_files_from_path() {
        let dir = std::env::temp_dir().join(format!("feeds-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(dir.join("store_status.csv")).await.unwrap();
        tokio::fs::write(dir.join("timezones.csv"), "store_id,timezone_str\ns1,UTC\n")
            .await
            .unwrap();
        tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

        let files = FeedFiles::from_path(&dir.to_string_lossy()).await.unwrap();
        tokio::fs::remove_dir_all(&dir).await.ok();

        // a directory named like a feed is not a feed
        assert!(files.store_status.is_none());
        assert!(files.business_hours.is_none());
        assert!(files.timezones.is_some());

        let parsed = parse_feeds_blocking(files).await.unwrap();
        assert_eq!(parsed.timezones[0].timezone_str, "UTC");
    }

    #[tokio::test]
    async fn test_missing_path_is_bad_request() {
        assert!(matches!(
            FeedFiles::from_path("/no/such/feeds.zip").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_invalid_zip_is_ingest_error() {
        assert!(matches!(
            FeedFiles::from_zip(b"not a zip".to_vec()),
            Err(AppError::Ingest(_))
        ));
    }
}
