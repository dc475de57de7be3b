//! Operator variants and their configuration records.
//!
//! Each bike-share operator is a plain configuration record consumed by the
//! shared pipeline: where to look for archives, how to pick the download
//! links, how its columns map onto the canonical schema, which holiday
//! jurisdiction applies and how its downloaded files classify into station
//! and trip tables. Adding an operator means adding a variant and a record.

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::holidays::HolidayRegion;

pub const SYS_LIST: &[&str] = &["bixi", "bsto", "cabi", "citi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Bixi, Montreal. Separate station table.
    Bixi,
    /// Bike Share Toronto. Station names embedded in the trip rows.
    Bsto,
    /// Capital Bikeshare, Washington DC.
    Cabi,
    /// Citi Bike, New York.
    Citi,
}

impl Operator {
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "bixi" => Ok(Self::Bixi),
            "bsto" => Ok(Self::Bsto),
            "cabi" => Ok(Self::Cabi),
            "citi" => Ok(Self::Citi),
            other => Err(anyhow!(
                "unknown bike system {other:?}, expected one of [{}]",
                SYS_LIST.join(", ")
            )),
        }
    }

    pub fn config(self) -> &'static OperatorConfig {
        match self {
            Self::Bixi => &BIXI,
            Self::Bsto => &BSTO,
            Self::Cabi => &CABI,
            Self::Citi => &CITI,
        }
    }
}

/// Where download links sit on the operator's page and how to read them out.
#[derive(Debug, Clone, Copy)]
pub struct LinkRule {
    /// CSS selector picking the link elements (a class for regular pages, a
    /// bare tag name for S3 bucket listings).
    pub selector: &'static str,
    pub source: LinkSource,
    /// Optional regex the element text must match.
    pub text_pattern: Option<&'static str>,
    /// Prefix prepended to bare keys (S3 listings publish keys, not hrefs).
    pub prefix: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Take the element's `href` attribute.
    Href,
    /// Take the element's text content.
    Text,
}

/// Filename-substring classification of downloaded files.
#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    /// Files whose name contains this are station metadata.
    pub station_marker: Option<&'static str>,
    /// When set, only files whose name contains this are trips; otherwise
    /// every non-station, non-excluded file is a trip file.
    pub trip_marker: Option<&'static str>,
    /// Paths containing this are ignored entirely (ZIP junk entries).
    pub exclude: Option<&'static str>,
}

impl FileRule {
    /// Partition downloaded files into (trip files, station files).
    pub fn classify<'a>(&self, files: &'a [std::path::PathBuf]) -> (Vec<&'a Path>, Vec<&'a Path>) {
        let mut trips = Vec::new();
        let mut stations = Vec::new();
        for file in files {
            let path_text = file.to_string_lossy().to_lowercase();
            if matches!(self.exclude, Some(marker) if path_text.contains(&marker.to_lowercase())) {
                continue;
            }
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if matches!(self.station_marker, Some(marker) if name.contains(&marker.to_lowercase()))
            {
                stations.push(file.as_path());
            } else if match self.trip_marker {
                Some(marker) => name.contains(&marker.to_lowercase()),
                None => true,
            } {
                trips.push(file.as_path());
            }
        }
        (trips, stations)
    }

    pub fn has_station_table(&self) -> bool {
        self.station_marker.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OperatorConfig {
    pub tag: &'static str,
    pub search_url: &'static str,
    pub link: LinkRule,
    pub rename: &'static [(&'static str, &'static str)],
    pub region: HolidayRegion,
    pub files: FileRule,
}

/// Bixi publishes `pk`-keyed station tables next to `od_*` trip tables.
static BIXI_RENAME: &[(&str, &str)] = &[
    ("emplacement_pk_start", "start_station_code"),
    ("emplacement_pk_end", "end_station_code"),
    ("pk", "code"),
];

/// Bsto, Citi and Cabi embed station fields in the trip rows and share one
/// canonical mapping.
static SHARED_RENAME: &[(&str, &str)] = &[
    ("from_station_id", "start_station_code"),
    ("to_station_id", "end_station_code"),
    ("trip_start_time", "start_date"),
    ("trip_stop_time", "end_date"),
    ("from_station_name", "name"),
    ("to_station_name", "end_name"),
];

static BIXI: OperatorConfig = OperatorConfig {
    tag: "bixi",
    search_url: "https://bixi.com/en/open-data",
    link: LinkRule {
        selector: ".document-csv",
        source: LinkSource::Href,
        text_pattern: None,
        prefix: None,
    },
    rename: BIXI_RENAME,
    region: HolidayRegion::CaQc,
    files: FileRule {
        station_marker: Some("stations"),
        trip_marker: Some("od_"),
        exclude: None,
    },
};

static BSTO: OperatorConfig = OperatorConfig {
    tag: "bsto",
    search_url:
        "https://ckan0.cf.opendata.inter.prod-toronto.ca/tr/dataset/bike-share-toronto-ridership-data",
    link: LinkRule {
        selector: ".resource-url-analytics",
        source: LinkSource::Href,
        text_pattern: None,
        prefix: None,
    },
    rename: SHARED_RENAME,
    region: HolidayRegion::CaOn,
    files: FileRule {
        station_marker: None,
        trip_marker: None,
        exclude: None,
    },
};

static CABI: OperatorConfig = OperatorConfig {
    tag: "cabi",
    search_url: "https://s3.amazonaws.com/capitalbikeshare-data",
    link: LinkRule {
        selector: "key",
        source: LinkSource::Text,
        text_pattern: Some(r"\.zip$"),
        prefix: Some("https://s3.amazonaws.com/capitalbikeshare-data"),
    },
    rename: SHARED_RENAME,
    region: HolidayRegion::UsDc,
    files: FileRule {
        station_marker: None,
        trip_marker: None,
        exclude: Some("__macosx/"),
    },
};

static CITI: OperatorConfig = OperatorConfig {
    tag: "citi",
    search_url: "https://s3.amazonaws.com/tripdata",
    link: LinkRule {
        selector: "key",
        source: LinkSource::Text,
        text_pattern: Some(r"\.zip$"),
        prefix: Some("https://s3.amazonaws.com/tripdata"),
    },
    rename: SHARED_RENAME,
    region: HolidayRegion::UsNy,
    files: FileRule {
        station_marker: None,
        trip_marker: None,
        exclude: Some("__macosx/"),
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn from_tag_round_trip() {
        for &tag in SYS_LIST {
            assert_eq!(Operator::from_tag(tag).unwrap().config().tag, tag);
        }
    }

    #[test]
    fn unknown_tag_error_lists_valid_tags() {
        let err = Operator::from_tag("velib").unwrap_err().to_string();
        assert!(err.contains("velib"));
        assert!(err.contains("bixi, bsto, cabi, citi"));
    }

    #[test]
    fn bixi_classification_splits_stations_and_trips() {
        let files = vec![
            PathBuf::from("data/biximontrealrentals2021/od_2021-07.csv"),
            PathBuf::from("data/biximontrealrentals2021/stations.csv"),
            PathBuf::from("data/biximontrealrentals2021/readme.txt"),
        ];
        let (trips, stations) = BIXI.files.classify(&files);
        assert_eq!(trips, [files[0].as_path()]);
        assert_eq!(stations, [files[1].as_path()]);
    }

    #[test]
    fn citi_classification_skips_macosx_entries() {
        let files = vec![
            PathBuf::from("data/202107-citibike-tripdata/202107-citibike-tripdata.csv"),
            PathBuf::from("data/202107-citibike-tripdata/__MACOSX/._202107.csv"),
        ];
        let (trips, stations) = CITI.files.classify(&files);
        assert_eq!(trips, [files[0].as_path()]);
        assert!(stations.is_empty());
        assert!(!CITI.files.has_station_table());
    }
}
