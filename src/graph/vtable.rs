//! Dynamic dispatch resolution
//!
//! The VTable is filled in a dedicated pass after all fragments are merged and
//! before any call edges are resolved. A call through an interface resolves to
//! the method of every registered implementation, which over-approximates the
//! runtime target set.

use super::model::NodeId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Methods and declared base of one concrete type name.
///
/// Same-named types declared in different files share an entry, but each
/// method keeps the id of every file that defines it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeEntry {
    /// First declared base class or interface, if any
    pub base: Option<String>,
    pub methods: BTreeMap<String, BTreeSet<NodeId>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VTable {
    types: BTreeMap<String, TypeEntry>,
    /// interface -> implementing types
    implementations: BTreeMap<String, BTreeSet<String>>,
    /// interface -> declared method names
    interfaces: BTreeMap<String, BTreeSet<String>>,
}

impl VTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a type's methods. Registering the same type name twice merges
    /// the method maps and keeps every id per method name.
    pub fn register_type<I>(&mut self, type_name: &str, interface: Option<&str>, methods: I)
    where
        I: IntoIterator<Item = (String, NodeId)>,
    {
        let entry = self.types.entry(type_name.to_string()).or_default();
        if entry.base.is_none() {
            entry.base = interface.map(str::to_string);
        }
        for (name, id) in methods {
            entry.methods.entry(name).or_default().insert(id);
        }

        if let Some(iface) = interface {
            self.register_implementation(iface, type_name);
        }
    }

    /// Record that `type_name` satisfies `interface`. Duplicates are ignored.
    pub fn register_implementation(&mut self, interface: &str, type_name: &str) {
        if interface == type_name {
            return;
        }
        self.implementations
            .entry(interface.to_string())
            .or_default()
            .insert(type_name.to_string());
    }

    /// Record the method set an interface (or trait, or abstract base) declares.
    pub fn register_interface<I, S>(&mut self, interface: &str, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = self.interfaces.entry(interface.to_string()).or_default();
        set.extend(methods.into_iter().map(Into::into));
    }

    /// Every implementation's method for `(interface, method)`.
    ///
    /// Returns an empty list when either is unknown. The result is sorted
    /// and contains no duplicates.
    pub fn resolve(&self, interface: &str, method: &str) -> Vec<NodeId> {
        let Some(impls) = self.implementations.get(interface) else {
            return Vec::new();
        };

        let mut targets: BTreeSet<NodeId> = BTreeSet::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: Vec<&str> = impls.iter().map(String::as_str).collect();

        // Implementations of sub-interfaces count too
        while let Some(ty) = queue.pop() {
            if !seen.insert(ty) {
                continue;
            }
            targets.extend(self.methods_of(ty, method).into_iter().cloned());
            if let Some(sub) = self.implementations.get(ty) {
                queue.extend(sub.iter().map(String::as_str));
            }
        }

        targets.into_iter().collect()
    }

    /// Interfaces whose declared method set contains `method`
    pub fn interfaces_declaring(&self, method: &str) -> Vec<&str> {
        self.interfaces
            .iter()
            .filter(|(_, methods)| methods.contains(method))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Interfaces a type is registered as implementing
    pub fn interfaces_of(&self, type_name: &str) -> Vec<&str> {
        self.implementations
            .iter()
            .filter(|(_, types)| types.contains(type_name))
            .map(|(iface, _)| iface.as_str())
            .collect()
    }

    pub fn is_known_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name) || self.interfaces.contains_key(type_name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Every definition of `method` on types named `type_name`, sorted
    pub fn methods_of(&self, type_name: &str, method: &str) -> Vec<&NodeId> {
        self.types
            .get(type_name)
            .and_then(|t| t.methods.get(method))
            .map(|ids| ids.iter().collect())
            .unwrap_or_default()
    }

    /// Structural typing: a type implements each listed interface whose
    /// method set is a non-empty subset of the type's methods.
    ///
    /// Returns the number of implementations added.
    pub fn infer_structural_implementations<'a, I>(&mut self, interfaces: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found: Vec<(String, String)> = Vec::new();
        for iface in interfaces {
            let Some(required) = self.interfaces.get(iface) else {
                continue;
            };
            if required.is_empty() {
                continue;
            }
            for (ty, entry) in &self.types {
                if ty != iface && required.iter().all(|m| entry.methods.contains_key(m)) {
                    found.push((iface.to_string(), ty.clone()));
                }
            }
        }

        let mut added = 0;
        for (iface, ty) in found {
            let before = self.implementations.get(&iface).map_or(0, BTreeSet::len);
            self.register_implementation(&iface, &ty);
            if self.implementations.get(&iface).map_or(0, BTreeSet::len) > before {
                added += 1;
            }
        }
        added
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }
}
