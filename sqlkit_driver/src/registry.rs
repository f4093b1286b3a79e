use crate::Datasource;
use crate::Error::{DatasourceNotFound, IoError};
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use tracing::info;

type DatasourceMap = BTreeMap<String, Arc<dyn Datasource>>;

/// Named registry of configured datasources.
///
/// Built once at process start and passed down to whatever constructs
/// database facades; looking up a name that was never configured returns
/// `None` and the caller decides how to surface the absence.
#[derive(Debug, Default)]
pub struct DatasourceRegistry {
    datasources: RwLock<DatasourceMap>,
}

impl DatasourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a datasource under `name`, replacing any previous registration.
    ///
    /// # Errors
    /// * If the registry lock cannot be acquired
    pub fn register<S: Into<String>>(&self, name: S, datasource: Arc<dyn Datasource>) -> Result<()> {
        let name = name.into();
        let mut datasources = self
            .datasources
            .write()
            .map_err(|error| IoError(error.to_string()))?;
        info!("datasource registered: {name}");
        let _ = datasources.insert(name, datasource);
        Ok(())
    }

    /// Get a datasource by name
    ///
    /// # Errors
    /// * If the registry lock cannot be acquired
    pub fn get<S: AsRef<str>>(&self, name: S) -> Result<Option<Arc<dyn Datasource>>> {
        let datasources = self
            .datasources
            .read()
            .map_err(|error| IoError(error.to_string()))?;
        Ok(datasources.get(name.as_ref()).cloned())
    }

    /// Get a datasource by name, failing when it was never registered.
    ///
    /// # Errors
    /// * If the name is not registered or the registry lock cannot be
    ///   acquired
    pub fn require<S: AsRef<str>>(&self, name: S) -> Result<Arc<dyn Datasource>> {
        let name = name.as_ref();
        self.get(name)?
            .ok_or_else(|| DatasourceNotFound(name.to_string()))
    }

    /// All registered names, sorted.
    ///
    /// # Errors
    /// * If the registry lock cannot be acquired
    pub fn names(&self) -> Result<Vec<String>> {
        let datasources = self
            .datasources
            .read()
            .map_err(|error| IoError(error.to_string()))?;
        Ok(datasources.keys().cloned().collect())
    }
}
