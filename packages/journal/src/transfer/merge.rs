use std::collections::{HashMap, HashSet};

use common::new_id;

use crate::model::Identified;

/// Old id to fresh id, produced when an incoming id collides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRemap(HashMap<String, String>);

impl IdRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.0.insert(old.into(), new.into());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.0.get(old).map(String::as_str)
    }

    /// Rewrite `id` in place if it was remapped. Returns whether it changed.
    pub fn rewrite(&self, id: &mut String) -> bool {
        match self.0.get(id.as_str()) {
            Some(new) => {
                *id = new.clone();
                true
            }
            None => false,
        }
    }

    pub fn rewrite_opt(&self, id: &mut Option<String>) -> bool {
        id.as_mut().is_some_and(|id| self.rewrite(id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Append `incoming` to `local`, giving a fresh id to every record whose id
/// is missing or already taken.
///
/// `relink` runs on each incoming record after its own id is settled; children
/// use it to rewrite their parent id through the parent's remap. Returns the
/// remap of this collection.
pub fn merge_by_id<T: Identified>(
    local: &mut Vec<T>,
    incoming: Vec<T>,
    mut relink: impl FnMut(&mut T),
) -> IdRemap {
    let mut seen: HashSet<String> = local.iter().map(|r| r.id().to_string()).collect();
    let mut remap = IdRemap::new();

    local.reserve(incoming.len());
    for mut record in incoming {
        if record.id().is_empty() || seen.contains(record.id()) {
            let fresh = new_id();
            if !record.id().is_empty() {
                remap.insert(record.id(), fresh.clone());
            }
            record.set_id(fresh);
        }
        relink(&mut record);
        seen.insert(record.id().to_string());
        local.push(record);
    }
    remap
}
