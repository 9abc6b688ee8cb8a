//! Energy pool - fixed budget shared by all agents
//!
//! `available + Σ allocations == total` after every operation. Requests
//! beyond what is available are clamped, never rejected.

use agentmesh_core::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Absolute tolerance for the conservation check.
pub const ENERGY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPool {
    pub total: f64,
    pub available: f64,
    pub allocations: HashMap<AgentId, f64>,
}

impl EnergyPool {
    pub fn new(total: f64) -> Self {
        let total = total.max(0.0);
        Self {
            total,
            available: total,
            allocations: HashMap::new(),
        }
    }

    /// Grant up to `amount` from the free pool. Returns the amount granted.
    pub fn allocate(&mut self, id: &AgentId, amount: f64) -> f64 {
        let actual = amount.max(0.0).min(self.available);
        self.available -= actual;
        *self.allocations.entry(id.clone()).or_insert(0.0) += actual;
        actual
    }

    /// Move up to `amount` from one allocation to another. Returns the amount moved.
    pub fn transfer(&mut self, from: &AgentId, to: &AgentId, amount: f64) -> f64 {
        let held = self.allocation(from);
        let actual = amount.max(0.0).min(held);
        if from == to || actual == 0.0 {
            return 0.0;
        }
        self.allocations.insert(from.clone(), held - actual);
        *self.allocations.entry(to.clone()).or_insert(0.0) += actual;
        actual
    }

    /// Return an agent's whole allocation to the free pool.
    pub fn release(&mut self, id: &AgentId) -> f64 {
        let returned = self.allocations.remove(id).unwrap_or(0.0);
        self.available += returned;
        returned
    }

    pub fn allocation(&self, id: &AgentId) -> f64 {
        self.allocations.get(id).copied().unwrap_or(0.0)
    }

    pub fn distributed(&self) -> f64 {
        self.total - self.available
    }

    pub fn allocated_sum(&self) -> f64 {
        self.allocations.values().sum()
    }

    pub fn is_conserved(&self) -> bool {
        self.available >= -ENERGY_EPSILON
            && (self.available + self.allocated_sum() - self.total).abs() < ENERGY_EPSILON
    }
}
