//! Read-only reference catalogs
//!
//! Standard machines, custom machines and pesticide products, indexed by exact
//! name and by normalized name (lowercase, trimmed, collapsed whitespace).
//! Identity is the name: two entries that normalize to the same key are both
//! kept, and lookups through that key are reported as ambiguous.

use crate::data::{self, CsvTable};
use crate::types::{CustomMachine, Product, StandardMachine};
use crate::utils::similarity::normalize_name;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
}

/// Which catalog table a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Product,
    Machine,
}

/// Name lookup for one table: exact name and normalized name → positions
#[derive(Debug, Default, Clone)]
struct NameIndex {
    exact: FxHashMap<String, usize>,
    normalized: FxHashMap<String, Vec<usize>>,
    names: Vec<String>,
}

impl NameIndex {
    fn insert(&mut self, kind: &'static str, name: &str) -> Result<(), CatalogError> {
        if self.exact.contains_key(name) {
            return Err(CatalogError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        let position = self.names.len();
        self.exact.insert(name.to_string(), position);
        self.normalized
            .entry(normalize_name(name))
            .or_default()
            .push(position);
        self.names.push(name.to_string());
        Ok(())
    }

    fn exact(&self, name: &str) -> Option<usize> {
        self.exact.get(name).copied()
    }

    fn normalized(&self, name: &str) -> &[usize] {
        self.normalized
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Shared, read-only lookup tables injected into scoring and reconciliation
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    machines: Vec<StandardMachine>,
    custom_machines: Vec<CustomMachine>,
    products: Vec<Product>,
    /// Standard and custom machines share one namespace
    machine_index: NameIndex,
    product_index: NameIndex,
}

/// A machine found by name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MachineEntry<'a> {
    Standard(&'a StandardMachine),
    Custom(&'a CustomMachine),
}

impl<'a> MachineEntry<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Standard(m) => &m.name,
            Self::Custom(m) => &m.name,
        }
    }
}

impl Catalog {
    pub fn new(
        machines: Vec<StandardMachine>,
        custom_machines: Vec<CustomMachine>,
        products: Vec<Product>,
    ) -> Result<Self, CatalogError> {
        let mut machine_index = NameIndex::default();
        for machine in &machines {
            machine_index.insert("machine", &machine.name)?;
        }
        for machine in &custom_machines {
            machine_index.insert("machine", &machine.name)?;
        }

        let mut product_index = NameIndex::default();
        for product in &products {
            product_index.insert("product", &product.display_name)?;
        }

        Ok(Self {
            machines,
            custom_machines,
            products,
            machine_index,
            product_index,
        })
    }

    /// Load catalogs from CSV files. The custom-machine file is optional.
    pub fn from_csv_files(
        machines_path: &Path,
        products_path: &Path,
        custom_machines_path: Option<&Path>,
    ) -> Result<Self> {
        let machines = data::load_standard_machines(&CsvTable::from_path(machines_path)?)
            .with_context(|| format!("Failed to load machines from {:?}", machines_path))?;
        let products = data::load_products(&CsvTable::from_path(products_path)?)
            .with_context(|| format!("Failed to load products from {:?}", products_path))?;
        let custom_machines = match custom_machines_path {
            Some(path) => data::load_custom_machines(&CsvTable::from_path(path)?)
                .with_context(|| format!("Failed to load custom machines from {:?}", path))?,
            None => Vec::new(),
        };

        let catalog = Self::new(machines, custom_machines, products)?;
        tracing::info!(
            "Catalog ready: {} machines, {} custom machines, {} products",
            catalog.machines.len(),
            catalog.custom_machines.len(),
            catalog.products.len()
        );
        Ok(catalog)
    }

    /// Same as `from_csv_files`, from in-memory CSV contents
    pub fn from_csv_bytes(
        machines_csv: Vec<u8>,
        products_csv: Vec<u8>,
        custom_machines_csv: Option<Vec<u8>>,
    ) -> Result<Self> {
        let machines = data::load_standard_machines(&CsvTable::from_bytes(machines_csv)?)?;
        let products = data::load_products(&CsvTable::from_bytes(products_csv)?)?;
        let custom_machines = match custom_machines_csv {
            Some(bytes) => data::load_custom_machines(&CsvTable::from_bytes(bytes)?)?,
            None => Vec::new(),
        };
        Ok(Self::new(machines, custom_machines, products)?)
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.product_index.exact(name).map(|i| &self.products[i])
    }

    pub fn standard_machine(&self, name: &str) -> Option<&StandardMachine> {
        self.machine(name).and_then(|entry| match entry {
            MachineEntry::Standard(m) => Some(m),
            MachineEntry::Custom(_) => None,
        })
    }

    pub fn custom_machine(&self, name: &str) -> Option<&CustomMachine> {
        self.machine(name).and_then(|entry| match entry {
            MachineEntry::Custom(m) => Some(m),
            MachineEntry::Standard(_) => None,
        })
    }

    pub fn machine(&self, name: &str) -> Option<MachineEntry<'_>> {
        self.machine_index.exact(name).map(|i| self.machine_at(i))
    }

    fn machine_at(&self, position: usize) -> MachineEntry<'_> {
        if position < self.machines.len() {
            MachineEntry::Standard(&self.machines[position])
        } else {
            MachineEntry::Custom(&self.custom_machines[position - self.machines.len()])
        }
    }

    /// Catalog names equal to `name` after normalization
    pub fn normalized_matches(&self, kind: EntryKind, name: &str) -> Vec<&str> {
        let index = self.index(kind);
        index
            .normalized(name)
            .iter()
            .map(|&i| index.names[i].as_str())
            .collect()
    }

    /// Whether `name` is an exact catalog name
    pub fn contains(&self, kind: EntryKind, name: &str) -> bool {
        self.index(kind).exact(name).is_some()
    }

    /// All names of one table, in load order
    pub fn names(&self, kind: EntryKind) -> impl Iterator<Item = &str> {
        self.index(kind).names.iter().map(String::as_str)
    }

    fn index(&self, kind: EntryKind) -> &NameIndex {
        match kind {
            EntryKind::Product => &self.product_index,
            EntryKind::Machine => &self.machine_index,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn standard_machines(&self) -> &[StandardMachine] {
        &self.machines
    }

    pub fn custom_machines(&self) -> &[CustomMachine] {
        &self.custom_machines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomMachineTool;

    fn machine(name: &str) -> StandardMachine {
        StandardMachine {
            name: name.to_string(),
            depth: 10.0,
            speed: 8.0,
            surface_fraction: 1.0,
            tillage_factor: 0.7,
            rotates: false,
            picture: String::new(),
        }
    }

    fn product(name: &str) -> Product {
        Product {
            display_name: name.to_string(),
            product_type: Some("Herbicide".to_string()),
            application_method: None,
            base_eiq: 20.0,
            ai_percent: 50.0,
            default_rate: 1.0,
            default_rate_unit: "lbs/acre".to_string(),
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let custom = CustomMachine::new(
            "My Combo",
            8.0,
            vec![CustomMachineTool::new("Disc", 5.0, 1.0, 0.5, false)],
        )
        .unwrap();
        let catalog = Catalog::new(vec![machine("Chisel Plow")], vec![custom], vec![product("Roundup")]).unwrap();

        assert!(catalog.standard_machine("Chisel Plow").is_some());
        assert!(catalog.custom_machine("Chisel Plow").is_none());
        assert_eq!(catalog.machine("My Combo").map(|m| m.name()), Some("My Combo"));
        assert!(catalog.product("Roundup").is_some());
        assert!(catalog.product("roundup").is_none());
        assert!(catalog.contains(EntryKind::Machine, "My Combo"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Catalog::new(vec![machine("Disk"), machine("Disk")], vec![], vec![]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateName {
                kind: "machine",
                name: "Disk".to_string()
            }
        );
    }

    #[test]
    fn test_normalized_matches() {
        let catalog = Catalog::new(vec![], vec![], vec![product("Roundup PowerMax"), product("ROUNDUP  powermax")]).unwrap();
        let matches = catalog.normalized_matches(EntryKind::Product, " roundup powermax ");
        assert_eq!(matches, vec!["Roundup PowerMax", "ROUNDUP  powermax"]);
        assert!(catalog.normalized_matches(EntryKind::Product, "Atrazine").is_empty());
    }

    #[test]
    fn test_from_csv_bytes() {
        let machines = b"name,depth,speed,surface_area_disturbed,tillage_type_factor\nDisk,10,8,100,0.7\n".to_vec();
        let products = b"product name,AI1 eiq,AI1concentration,rate UOM\nRoundup,15.3,48.7,qt/acre\n".to_vec();
        let catalog = Catalog::from_csv_bytes(machines, products, None).unwrap();

        assert_eq!(catalog.standard_machines().len(), 1);
        assert_eq!(catalog.product("Roundup").map(|p| p.default_rate_unit.as_str()), Some("quarts/acre"));
        assert_eq!(catalog.names(EntryKind::Product).collect::<Vec<_>>(), vec!["Roundup"]);
    }
}
