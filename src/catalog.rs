//! Table registry: maps a stable `table_id` to the `HeapFile` backing it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::SmallError;
use crate::heap_file::HeapFile;
use crate::util::HandyRwLock;

pub struct Catalog {
    tables: RwLock<HashMap<u64, Arc<HeapFile>>>,
    names: RwLock<HashMap<String, u64>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, name: &str, file: Arc<HeapFile>) {
        let table_id = file.table_id();
        self.tables.wl().insert(table_id, file);
        self.names.wl().insert(name.to_string(), table_id);
    }

    pub fn get_db_file(&self, table_id: u64) -> Result<Arc<HeapFile>, SmallError> {
        self.tables
            .rl()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| SmallError::no_such_element(&format!("no table with id {}", table_id)))
    }

    pub fn get_table_id(&self, name: &str) -> Result<u64, SmallError> {
        self.names
            .rl()
            .get(name)
            .copied()
            .ok_or_else(|| SmallError::no_such_element(&format!("no table named {}", name)))
    }
}
