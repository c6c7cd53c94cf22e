use crate::core::retrieval;
use crate::domain::model::{AgeGroup, NeedCategory, ServiceRecord, TargetAge};
use crate::utils::error::{HandoutError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Raw catalog row, as found in the CSV.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: u32,
    name: String,
    #[serde(default)]
    description: String,
    category: String,
    #[serde(default)]
    languages: String,
    #[serde(default)]
    target_age: String,
    #[serde(default)]
    hours_today: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    eligibility: String,
}

impl From<CatalogRow> for ServiceRecord {
    fn from(row: CatalogRow) -> Self {
        ServiceRecord {
            id: row.id,
            name: row.name.trim().to_string(),
            description: row.description.trim().to_string(),
            category: row.category.trim().to_string(),
            languages: parse_languages(&row.languages),
            target_age: TargetAge::parse(&row.target_age),
            hours_today: row.hours_today.trim().to_string(),
            address: row.address.trim().to_string(),
            eligibility: row.eligibility.trim().to_string(),
        }
    }
}

/// `"Cree; English"` -> `["Cree", "English"]`, order kept, blanks dropped.
pub fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read-only service catalog, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<ServiceRecord>,
}

impl ServiceCatalog {
    pub fn new(services: Vec<ServiceRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for service in &services {
            if !seen.insert(service.id) {
                return Err(HandoutError::CatalogError {
                    message: format!("duplicate service id {}", service.id),
                });
            }
        }
        Ok(Self { services })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("📚 Loading service catalog from: {}", path.display());
        let file = std::fs::File::open(path).map_err(|e| HandoutError::CatalogError {
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let mut services = Vec::new();
        for (index, row) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            // 第 1 列是標題
            let row = row.map_err(|e| HandoutError::CatalogError {
                message: format!("row {}: {}", index + 2, e),
            })?;
            let record = ServiceRecord::from(row);

            if NeedCategory::from_tag(&record.category).is_none() {
                tracing::warn!(
                    "Service {} has category '{}' outside the need vocabulary",
                    record.id,
                    record.category
                );
            }
            if let TargetAge::Unrecognized(raw) = &record.target_age {
                tracing::warn!(
                    "Service {} has unrecognized target_age '{}' and will never match",
                    record.id,
                    raw
                );
            }
            services.push(record);
        }

        let catalog = Self::new(services)?;
        tracing::info!("📊 Loaded {} services", catalog.len());
        Ok(catalog)
    }

    pub fn get(&self, id: u32) -> Option<&ServiceRecord> {
        self.services.iter().find(|svc| svc.id == id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn retrieve(
        &self,
        needs: &[NeedCategory],
        language: &str,
        age_group: AgeGroup,
    ) -> Vec<ServiceRecord> {
        retrieval::retrieve(&self.services, needs, language, age_group)
    }
}
