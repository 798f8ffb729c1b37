//! Replica groups: writers, readers and backups of one logical database.
//!
//! A [`Drivers`] group keeps one ordered list of [`Driver`]s per [`Role`] and
//! hands out a uniformly random member on each lookup.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::{BackendRegistry, DriversBuilder, SchemaBuilder};
//! use strata_core::testing::MemoryBackend;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! registry.register(MemoryBackend::new("memory"));
//!
//! let schema = SchemaBuilder::new();
//! schema.host("10.0.0.3").database("orders").username("app");
//!
//! let builder = DriversBuilder::new();
//! builder.set_id("orders").unwrap();
//! builder.set_name("memory").unwrap();
//! builder.registry(registry).add_reader(schema.build().unwrap());
//!
//! let group = builder.build().unwrap();
//! assert!(group.get_reader().is_ok());
//! assert!(group.get_writer().is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::BackendRegistry;
use crate::driver::{Driver, DriverBuilder};
use crate::dsn::DsnJoiner;
use crate::error::{CloseFailure, Error, Result};
use crate::picker::{IndexPicker, ThreadRngPicker};
use crate::profile::Profile;
use crate::role::Role;
use crate::schema::Schema;

/// Writers, readers and backups of one logical database.
pub struct Drivers {
    id: String,
    writers: Option<Vec<Driver>>,
    readers: Option<Vec<Driver>>,
    backups: Option<Vec<Driver>>,
    picker: Arc<dyn IndexPicker>,
}

impl Drivers {
    /// Assemble a group from drivers built elsewhere.
    ///
    /// `None` marks a role as never configured, `Some(vec![])` as configured
    /// but empty. At least one role must hold a driver.
    pub fn from_parts(
        id: impl AsRef<str>,
        writers: Option<Vec<Driver>>,
        readers: Option<Vec<Driver>>,
        backups: Option<Vec<Driver>>,
    ) -> Result<Self> {
        let id = id.as_ref().trim().to_string();
        if id.is_empty() {
            return Err(Error::Empty("id"));
        }

        let populated = [&writers, &readers, &backups]
            .into_iter()
            .any(|role| matches!(role, Some(drivers) if !drivers.is_empty()));
        if !populated {
            return Err(Error::NoDrivers);
        }

        Ok(Self {
            id,
            writers,
            readers,
            backups,
            picker: Arc::new(ThreadRngPicker),
        })
    }

    /// Replace the random source used for role lookups.
    pub fn with_picker(mut self, picker: Arc<dyn IndexPicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Group identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drivers of a role, `None` when the role was never configured.
    pub fn role(&self, role: Role) -> Option<&[Driver]> {
        match role {
            Role::Writer => self.writers.as_deref(),
            Role::Reader => self.readers.as_deref(),
            Role::Backup => self.backups.as_deref(),
        }
    }

    /// All writers.
    pub fn writers(&self) -> Option<&[Driver]> {
        self.role(Role::Writer)
    }

    /// All readers.
    pub fn readers(&self) -> Option<&[Driver]> {
        self.role(Role::Reader)
    }

    /// All backups.
    pub fn backups(&self) -> Option<&[Driver]> {
        self.role(Role::Backup)
    }

    /// Pick a random driver of `role`.
    ///
    /// A single candidate is returned without consulting the picker.
    pub fn get(&self, role: Role) -> Result<&Driver> {
        let drivers = self.role(role).ok_or(Error::RoleNotConfigured(role))?;
        let len = drivers.len();
        let index = match len {
            0 => return Err(Error::RoleEmpty(role)),
            1 => 0,
            n => self.picker.pick(n),
        };
        drivers
            .get(index)
            .ok_or(Error::PickerOutOfRange { role, index, len })
    }

    /// Pick a random writer.
    pub fn get_writer(&self) -> Result<&Driver> {
        self.get(Role::Writer)
    }

    /// Pick a random reader.
    pub fn get_reader(&self) -> Result<&Driver> {
        self.get(Role::Reader)
    }

    /// Pick a random backup.
    pub fn get_backup(&self) -> Result<&Driver> {
        self.get(Role::Backup)
    }

    /// Close every driver in every role.
    ///
    /// Every driver gets a close attempt; all failures are returned, each
    /// tagged `<id>/<role>/<index>`.
    pub async fn close(&self) -> Vec<CloseFailure> {
        let mut failures = Vec::new();

        for role in Role::ALL {
            let Some(drivers) = self.role(role) else {
                continue;
            };
            for (index, driver) in drivers.iter().enumerate() {
                if let Err(error) = driver.close().await {
                    let component = format!("{}/{}/{}", self.id, role, index);
                    warn!(component = %component, error = %error, "Failed to close driver");
                    failures.push(CloseFailure::new(component, error));
                }
            }
        }

        info!(id = %self.id, failures = failures.len(), "Replica group closed");
        failures
    }
}

impl fmt::Debug for Drivers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drivers")
            .field("id", &self.id)
            .field("writers", &self.writers)
            .field("readers", &self.readers)
            .field("backups", &self.backups)
            .finish()
    }
}

#[derive(Default)]
struct DriversFields {
    id: String,
    name: String,
    joiner: Option<DsnJoiner>,
    picker: Option<Arc<dyn IndexPicker>>,
    registry: Option<Arc<BackendRegistry>>,
    writers: Vec<Schema>,
    readers: Vec<Schema>,
    backups: Vec<Schema>,
}

impl DriversFields {
    fn bucket(&mut self, role: Role) -> &mut Vec<Schema> {
        match role {
            Role::Writer => &mut self.writers,
            Role::Reader => &mut self.readers,
            Role::Backup => &mut self.backups,
        }
    }

    fn add_schema(&mut self, schema: Schema, write: bool, read: bool, backup: bool) {
        for (role, selected) in [(Role::Writer, write), (Role::Reader, read), (Role::Backup, backup)] {
            if selected {
                self.bucket(role).push(schema.clone());
            }
        }
    }
}

/// Builder for [`Drivers`].
///
/// The group id and backend name are write-once: setting the same value again
/// is accepted, a different one is an error. Configure the builder from one
/// thread (or externally synchronized), then call [`DriversBuilder::build`].
#[derive(Default)]
pub struct DriversBuilder {
    fields: Mutex<DriversFields>,
}

impl DriversBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the group id.
    pub fn set_id(&self, id: impl AsRef<str>) -> Result<()> {
        let mut f = self.fields.lock();
        set_once("id", &mut f.id, id.as_ref())
    }

    /// Set the backend name.
    pub fn set_name(&self, name: impl AsRef<str>) -> Result<()> {
        let mut f = self.fields.lock();
        set_once("name", &mut f.name, name.as_ref())
    }

    /// Replace the DSN strategy.
    pub fn dsn_joiner(&self, joiner: DsnJoiner) -> &Self {
        self.fields.lock().joiner = Some(joiner);
        self
    }

    /// Replace the random source handed to the built group.
    pub fn picker(&self, picker: Arc<dyn IndexPicker>) -> &Self {
        self.fields.lock().picker = Some(picker);
        self
    }

    /// Resolve backends in `registry` instead of the process-wide one.
    pub fn registry(&self, registry: Arc<BackendRegistry>) -> &Self {
        self.fields.lock().registry = Some(registry);
        self
    }

    /// Add a writer schema.
    pub fn add_writer(&self, schema: Schema) -> &Self {
        self.add(Role::Writer, schema)
    }

    /// Add a reader schema.
    pub fn add_reader(&self, schema: Schema) -> &Self {
        self.add(Role::Reader, schema)
    }

    /// Add a backup schema.
    pub fn add_backup(&self, schema: Schema) -> &Self {
        self.add(Role::Backup, schema)
    }

    /// Add a schema to a role.
    pub fn add(&self, role: Role, schema: Schema) -> &Self {
        self.fields.lock().bucket(role).push(schema);
        self
    }

    /// Add a schema to every selected role.
    pub fn add_schema(&self, schema: Schema, write: bool, read: bool, backup: bool) -> &Self {
        self.fields.lock().add_schema(schema, write, read, backup);
        self
    }

    /// Take id, backend name, one schema and its roles from a profile.
    ///
    /// Nothing is applied unless the whole profile is accepted.
    pub fn add_profile(&self, profile: &Profile) -> Result<()> {
        let schema = Schema::from_profile(profile)?;

        let mut f = self.fields.lock();
        check_once("id", &f.id, profile.id())?;
        check_once("name", &f.name, profile.driver())?;
        set_once("id", &mut f.id, profile.id())?;
        set_once("name", &mut f.name, profile.driver())?;

        debug!(
            id = %profile.id(),
            host = %schema.host(),
            roles = ?profile.roles(),
            "Adding profile to replica group"
        );
        f.add_schema(schema, profile.write(), profile.read(), profile.backup());
        Ok(())
    }

    /// Open one driver per schema per role.
    pub fn build(&self) -> Result<Drivers> {
        let f = self.fields.lock();

        if f.id.is_empty() {
            return Err(Error::Empty("id"));
        }

        if f.name.is_empty() {
            return Err(Error::Empty("name"));
        }

        if f.writers.is_empty() && f.readers.is_empty() && f.backups.is_empty() {
            return Err(Error::NoDrivers);
        }

        let builder = DriverBuilder::new();
        builder.name(&f.name);
        if let Some(joiner) = &f.joiner {
            builder.joiner(joiner.clone());
        }
        if let Some(registry) = &f.registry {
            builder.registry(registry.clone());
        }

        let open = |schemas: &[Schema]| -> Result<Option<Vec<Driver>>> {
            if schemas.is_empty() {
                return Ok(None);
            }
            schemas
                .iter()
                .map(|schema| builder.schema(schema.clone()).build())
                .collect::<Result<Vec<_>>>()
                .map(Some)
        };

        let writers = open(&f.writers)?;
        let readers = open(&f.readers)?;
        let backups = open(&f.backups)?;

        info!(
            id = %f.id,
            backend = %f.name,
            writers = f.writers.len(),
            readers = f.readers.len(),
            backups = f.backups.len(),
            "Replica group built"
        );

        Ok(Drivers {
            id: f.id.clone(),
            writers,
            readers,
            backups,
            picker: f.picker.clone().unwrap_or_else(|| Arc::new(ThreadRngPicker)),
        })
    }
}

/// Write-once assignment shared by the group builders.
pub(crate) fn set_once(field: &'static str, slot: &mut String, value: &str) -> Result<()> {
    check_once(field, slot, value)?;
    if slot.is_empty() {
        *slot = value.trim().to_string();
    }
    Ok(())
}

/// Whether [`set_once`] would accept `value` for `slot`, without writing.
pub(crate) fn check_once(field: &'static str, slot: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Empty(field));
    }

    if !slot.is_empty() && slot != value {
        return Err(Error::conflict(field, value, slot));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::testing::MemoryBackend;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPicker {
        calls: AtomicUsize,
        next: usize,
    }

    impl IndexPicker for CountingPicker {
        fn pick(&self, _len: usize) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.next
        }
    }

    fn schema(host: &str) -> Schema {
        let builder = SchemaBuilder::new();
        builder.host(host).database("app").username("root");
        builder.build().unwrap()
    }

    fn builder(backend: &MemoryBackend) -> DriversBuilder {
        let registry = Arc::new(BackendRegistry::new());
        registry.register(backend.clone());

        let builder = DriversBuilder::new();
        builder.set_id("app").unwrap();
        builder.set_name("memory").unwrap();
        builder.registry(registry);
        builder
    }

    #[test]
    fn test_build_requires_id_first() {
        let builder = DriversBuilder::new();
        builder.add_writer(schema("w"));
        assert_eq!(builder.build().unwrap_err().to_string(), "id can't be empty");

        builder.set_id("app").unwrap();
        assert_eq!(builder.build().unwrap_err().to_string(), "name can't be empty");
    }

    #[test]
    fn test_build_requires_some_schema() {
        let builder = builder(&MemoryBackend::new("memory"));
        assert!(matches!(builder.build().unwrap_err(), Error::NoDrivers));
    }

    #[test]
    fn test_set_id_is_write_once() {
        let builder = DriversBuilder::new();
        assert!(builder.set_id("  ").is_err());
        builder.set_id("orders").unwrap();
        builder.set_id(" orders ").unwrap();

        let err = builder.set_id("users").unwrap_err();
        assert!(matches!(err, Error::Conflict { field: "id", .. }));

        builder.set_name("mysql").unwrap();
        assert!(builder.set_name("postgres").is_err());
    }

    #[test]
    fn test_reader_only_group() {
        let picker = Arc::new(CountingPicker {
            calls: AtomicUsize::new(0),
            next: 0,
        });
        let builder = builder(&MemoryBackend::new("memory"));
        builder.picker(picker.clone()).add_reader(schema("r1"));
        let group = builder.build().unwrap();

        assert_eq!(group.get_writer().unwrap_err().to_string(), "writers can't be nil");
        assert_eq!(group.get_backup().unwrap_err().to_string(), "backups can't be nil");

        let reader = group.get_reader().unwrap();
        assert_eq!(reader.schema().host(), "r1");
        assert_eq!(picker.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multiple_candidates_use_picker() {
        let picker = Arc::new(CountingPicker {
            calls: AtomicUsize::new(0),
            next: 2,
        });
        let builder = builder(&MemoryBackend::new("memory"));
        builder
            .picker(picker.clone())
            .add_writer(schema("w0"))
            .add_writer(schema("w1"))
            .add_writer(schema("w2"));
        let group = builder.build().unwrap();

        assert_eq!(group.get_writer().unwrap().schema().host(), "w2");
        assert_eq!(picker.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_schema_builds_separate_drivers_per_role() {
        let backend = MemoryBackend::new("memory");
        let builder = builder(&backend);
        builder.add_schema(schema("both"), true, true, false);
        let group = builder.build().unwrap();

        assert_eq!(group.writers().unwrap().len(), 1);
        assert_eq!(group.readers().unwrap().len(), 1);
        assert!(group.backups().is_none());
        assert_eq!(backend.opened().len(), 2);
    }

    #[test]
    fn test_add_profile() {
        let data: HashMap<String, String> = [
            ("id", "orders"),
            ("driver", "memory"),
            ("host", "10.0.0.9"),
            ("database", "orders"),
            ("username", "app"),
            ("write", "true"),
            ("backup", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let profile = Profile::new(&data).unwrap();

        let registry = Arc::new(BackendRegistry::new());
        registry.register(MemoryBackend::new("memory"));
        let builder = DriversBuilder::new();
        builder.registry(registry);
        builder.add_profile(&profile).unwrap();

        let group = builder.build().unwrap();
        assert_eq!(group.id(), "orders");
        assert_eq!(group.get_writer().unwrap().schema().host(), "10.0.0.9");
        assert!(group.get_backup().is_ok());
        assert!(group.get_reader().is_err());
    }

    #[test]
    fn test_add_profile_conflicting_id() {
        let builder = DriversBuilder::new();
        builder.set_id("users").unwrap();

        let data: HashMap<String, String> = [
            ("id", "orders"),
            ("driver", "memory"),
            ("host", "h"),
            ("database", "orders"),
            ("username", "app"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let profile = Profile::new(&data).unwrap();
        assert!(matches!(
            builder.add_profile(&profile).unwrap_err(),
            Error::Conflict { field: "id", .. }
        ));
    }

    #[test]
    fn test_failed_add_profile_leaves_builder_untouched() {
        let data: HashMap<String, String> = [
            ("id", "orders"),
            ("driver", "memory"),
            ("database", "orders"),
            ("username", "app"),
            ("write", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let profile = Profile::new(&data).unwrap();

        let builder = DriversBuilder::new();
        let err = builder.add_profile(&profile).unwrap_err();
        assert_eq!(err.to_string(), "host can't be empty");

        // id and name were not taken from the rejected profile.
        assert_eq!(builder.build().unwrap_err().to_string(), "id can't be empty");
        builder.set_id("users").unwrap();
        builder.set_name("mysql").unwrap();
    }

    #[test]
    fn test_add_profile_name_conflict_keeps_id() {
        let builder = DriversBuilder::new();
        builder.set_name("mysql").unwrap();

        let data: HashMap<String, String> = [
            ("id", "orders"),
            ("driver", "memory"),
            ("host", "h"),
            ("database", "orders"),
            ("username", "app"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let profile = Profile::new(&data).unwrap();

        assert!(matches!(
            builder.add_profile(&profile).unwrap_err(),
            Error::Conflict { field: "name", .. }
        ));
        builder.set_id("users").unwrap();
    }

    #[test]
    fn test_picker_out_of_range() {
        let picker = Arc::new(CountingPicker {
            calls: AtomicUsize::new(0),
            next: 5,
        });
        let builder = builder(&MemoryBackend::new("memory"));
        builder
            .picker(picker)
            .add_reader(schema("r0"))
            .add_reader(schema("r1"));
        let group = builder.build().unwrap();

        let err = group.get_reader().unwrap_err();
        assert!(matches!(
            err,
            Error::PickerOutOfRange {
                role: Role::Reader,
                index: 5,
                len: 2
            }
        ));
        assert_eq!(err.to_string(), "picker returned index 5 for 2 readers");
    }

    #[test]
    fn test_build_propagates_open_failure() {
        let backend = MemoryBackend::new("memory").fail_open("too many connections");
        let builder = builder(&backend);
        builder.add_reader(schema("r"));
        assert_eq!(builder.build().unwrap_err().to_string(), "too many connections");
    }

    #[test]
    fn test_from_parts_distinguishes_nil_and_empty() {
        let backend = MemoryBackend::new("memory");
        let builder = builder(&backend);
        builder.add_writer(schema("w"));
        let writer = builder
            .build()
            .unwrap()
            .writers
            .and_then(|mut w| w.pop())
            .unwrap();

        let group = Drivers::from_parts("app", Some(vec![writer]), Some(Vec::new()), None).unwrap();
        assert!(matches!(group.get_reader().unwrap_err(), Error::RoleEmpty(Role::Reader)));
        assert!(matches!(
            group.get_backup().unwrap_err(),
            Error::RoleNotConfigured(Role::Backup)
        ));
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(matches!(
            Drivers::from_parts("", None, None, None).unwrap_err(),
            Error::Empty("id")
        ));
        assert!(matches!(
            Drivers::from_parts("app", Some(Vec::new()), None, None).unwrap_err(),
            Error::NoDrivers
        ));
    }

    #[tokio::test]
    async fn test_close_collects_every_failure() {
        let backend = MemoryBackend::new("memory")
            .fail_close_when("(w1:")
            .fail_close_when("(b0:");
        let builder = builder(&backend);
        builder
            .add_writer(schema("w0"))
            .add_writer(schema("w1"))
            .add_reader(schema("r0"))
            .add_backup(schema("b0"));
        let group = builder.build().unwrap();

        let failures = group.close().await;
        let components: Vec<&str> = failures.iter().map(|f| f.component.as_str()).collect();
        assert_eq!(components, vec!["app/writer/1", "app/backup/0"]);
        assert_eq!(backend.close_calls(), 4);
    }
}
