use serde::{Deserialize, Serialize};

use crate::engine_api::errors::OrderFlowError;

/// A restaurant branch, i.e. a delivery origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub address: String,
    /// Paused branches take no deliveries.
    pub paused: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDirectory {
    branches: Vec<Branch>,
}

impl BranchDirectory {
    pub fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    /// Parses a directory definition of the form `id=address;id=address`. Addresses may contain commas.
    ///
    /// Blank entries are skipped. Entries without an `=`, or with an empty id or address, are an error.
    pub fn parse(definition: &str) -> Result<Self, OrderFlowError> {
        let branches = definition
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| {
                let (id, address) = entry
                    .split_once('=')
                    .map(|(id, addr)| (id.trim(), addr.trim()))
                    .filter(|(id, addr)| !id.is_empty() && !addr.is_empty())
                    .ok_or_else(|| OrderFlowError::InvalidOrder(format!("Invalid branch definition: '{entry}'")))?;
                Ok(Branch { id: id.to_string(), address: address.to_string(), paused: false })
            })
            .collect::<Result<Vec<_>, OrderFlowError>>()?;
        Ok(Self { branches })
    }

    /// Marks the given branches as paused. Unknown ids are ignored.
    pub fn pause<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        for branch in &mut self.branches {
            if ids.iter().any(|id| id.as_ref() == branch.id) {
                branch.paused = true;
            }
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}
