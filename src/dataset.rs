//! City dataset accessor
//!
//! Loads the per-city index table once and serves read-only lookups.
//! Matching is plain case-insensitive containment, no ranking.

use crate::error::AdvisorError;
use crate::models::CityRecord;
use crate::Result;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::info;

const CONTEXT_HEADER: &str = "REAL-TIME DATABASE CONTEXT (Use this to answer):";

pub struct CityDataset {
    records: Vec<CityRecord>,
    /// Lowercased names, parallel to `records`
    lowered: Vec<String>,
}

impl CityDataset {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AdvisorError::MissingAsset(format!(
                "city dataset not found at {}",
                path.display()
            )));
        }

        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;

        info!(
            path = %path.display(),
            cities = dataset.len(),
            "City dataset loaded"
        );

        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in csv_reader.deserialize::<CityRecord>() {
            records.push(row?);
        }

        Self::from_records(records)
    }

    pub fn from_records(records: Vec<CityRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.name.to_lowercase()) {
                return Err(AdvisorError::Dataset(format!(
                    "duplicate city row: {}",
                    record.name
                )));
            }
        }

        let lowered = records.iter().map(|r| r.name.to_lowercase()).collect();

        Ok(Self { records, lowered })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CityRecord] {
        &self.records
    }

    /// Exact (case-insensitive) lookup by city name
    pub fn find(&self, name: &str) -> Result<&CityRecord> {
        let needle = name.trim().to_lowercase();
        self.lowered
            .iter()
            .position(|candidate| *candidate == needle)
            .map(|idx| &self.records[idx])
            .ok_or_else(|| AdvisorError::CityNotFound(name.to_string()))
    }

    /// Every record whose name appears somewhere in `text`, in dataset order
    pub fn search(&self, text: &str) -> Vec<&CityRecord> {
        let haystack = text.to_lowercase();
        self.lowered
            .iter()
            .zip(&self.records)
            .filter(|(name, _)| !name.is_empty() && haystack.contains(name.as_str()))
            .map(|(_, record)| record)
            .collect()
    }

    /// Context block for the cities mentioned in `text`; empty when none match
    pub fn city_context(&self, text: &str) -> String {
        let matches = self.search(text);
        if matches.is_empty() {
            return String::new();
        }

        let blocks: Vec<String> = matches.iter().map(|r| format_record(r)).collect();
        format!("\n{}\n{}", CONTEXT_HEADER, blocks.join("\n"))
    }

    /// Sorted city names for pickers
    pub fn city_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn format_record(record: &CityRecord) -> String {
    format!(
        "Data for {}, {}:\n\
         - Cost of Living Index: {}\n\
         - Rent Index: {}\n\
         - Groceries Index: {}\n\
         - Local Purchasing Power: {}\n",
        record.name,
        record.country,
        record.cost_of_living_index,
        record.rent_index,
        record.groceries_index,
        record.purchasing_power_index,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CSV: &str = "\
City,Country,Cost of Living Index,Rent Index,Groceries Index,Restaurant Price Index,Local Purchasing Power Index,Latitude,Longitude
Paris,France,75.0,50.0,60.0,55.0,90.0,48.8566,2.3522
Pune,India,22.0,6.0,25.0,18.0,110.0,18.5204,73.8567
New York,United States,100.0,100.0,100.0,100.0,100.0,40.7128,-74.006
";

    pub(crate) fn sample_dataset() -> CityDataset {
        CityDataset::from_reader(SAMPLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_loads_all_columns() {
        let dataset = sample_dataset();
        assert_eq!(dataset.len(), 3);

        let paris = dataset.find("Paris").unwrap();
        assert_eq!(paris.country, "France");
        assert_eq!(paris.rent_index, 50.0);
        assert_eq!(paris.purchasing_power_index, 90.0);
        assert_eq!(paris.longitude, 2.3522);
    }

    #[test]
    fn test_find_is_case_insensitive_and_exact() {
        let dataset = sample_dataset();
        assert_eq!(dataset.find("new york").unwrap().name, "New York");
        assert!(matches!(
            dataset.find("York"),
            Err(AdvisorError::CityNotFound(_))
        ));
    }

    #[test]
    fn test_search_finds_city_embedded_in_query() {
        let dataset = sample_dataset();
        let hits = dataset.search("Is it cheaper to live in PARIS or somewhere else?");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Paris");

        assert!(dataset.search("What about Atlantis?").is_empty());
    }

    #[test]
    fn test_search_returns_dataset_order() {
        let dataset = sample_dataset();
        let hits = dataset.search("new york vs pune vs paris");
        let names: Vec<_> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Paris", "Pune", "New York"]);
    }

    #[test]
    fn test_city_context_block() {
        let dataset = sample_dataset();
        let context = dataset.city_context("moving to pune");
        assert!(context.contains(CONTEXT_HEADER));
        assert!(context.contains("Data for Pune, India:"));
        assert!(context.contains("- Rent Index: 6"));
        assert!(!context.contains("Paris"));

        assert_eq!(dataset.city_context("no cities here"), "");
    }

    #[test]
    fn test_duplicate_city_rejected() {
        let csv = format!("{}Paris,France,1,1,1,1,1,0,0\n", SAMPLE_CSV);
        let err = CityDataset::from_reader(csv.as_bytes()).err().unwrap();
        assert!(matches!(err, AdvisorError::Dataset(_)));
    }

    #[test]
    fn test_missing_file_is_missing_asset() {
        let err = CityDataset::load(Path::new("/definitely/not/here.csv")).err().unwrap();
        assert!(matches!(err, AdvisorError::MissingAsset(_)));
    }

    #[test]
    fn test_city_names_sorted() {
        let dataset = sample_dataset();
        assert_eq!(dataset.city_names(), vec!["New York", "Paris", "Pune"]);
    }
}
