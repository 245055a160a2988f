//! Topological ranking of the module graph.
//!
//! A module's rank is its dependency depth: 0 for a root, otherwise one more
//! than the highest rank among its dependencies. Ranks are computed by a
//! fixed-point sweep; a sweep that assigns nothing while modules remain
//! unranked means those modules sit on (or behind) a cycle.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::module_system::error::ModuleSystemError;
use crate::module_system::record::ModuleRecord;

/// A module name paired with its computed rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedModule {
    pub name: String,
    pub rank: usize,
}

/// Ranks computed for a set of modules, in the order the modules were given.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    ranks: Vec<usize>,
}

impl Ranking {
    pub fn rank(&self, position: usize) -> Option<usize> {
        self.ranks.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Positions sorted by ascending rank; ties keep their input order.
    pub fn ascending(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..self.ranks.len()).collect();
        positions.sort_by_key(|&position| self.ranks[position]);
        positions
    }

    /// Positions sorted by descending rank; ties keep their input order.
    pub fn descending(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..self.ranks.len()).collect();
        positions.sort_by_key(|&position| std::cmp::Reverse(self.ranks[position]));
        positions
    }
}

/// Computes and assigns module ranks.
pub struct OrderResolver;

impl OrderResolver {
    /// Compute ranks without touching the records.
    pub fn compute(modules: &[Arc<ModuleRecord>]) -> Result<Ranking, ModuleSystemError> {
        if modules.is_empty() {
            return Ok(Ranking::default());
        }

        let positions: HashMap<&str, usize> = modules
            .iter()
            .enumerate()
            .map(|(position, record)| (record.name(), position))
            .collect();

        // Every referenced name must be registered.
        let mut seen = HashSet::new();
        let missing: Vec<String> = modules
            .iter()
            .flat_map(|record| record.dependency_names())
            .filter(|dependency| !positions.contains_key(dependency.as_str()))
            .filter(|dependency| seen.insert(dependency.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ModuleSystemError::MissingDependency { names: missing });
        }

        if !modules.iter().any(|record| record.is_root()) {
            return Err(ModuleSystemError::NoRootModule);
        }

        let mut ranks: Vec<Option<usize>> = vec![None; modules.len()];
        let mut remaining = modules.len();
        while remaining > 0 {
            let mut progressed = false;
            for (position, record) in modules.iter().enumerate() {
                if ranks[position].is_some() {
                    continue;
                }
                let mut highest: Option<usize> = None;
                let mut ready = true;
                for dependency in record.dependency_names() {
                    match ranks[positions[dependency.as_str()]] {
                        Some(rank) => highest = Some(highest.map_or(rank, |h| h.max(rank))),
                        None => {
                            ready = false;
                            break;
                        }
                    }
                }
                if ready {
                    ranks[position] = Some(highest.map_or(0, |h| h + 1));
                    remaining -= 1;
                    progressed = true;
                }
            }

            if !progressed {
                let stuck: Vec<String> = modules
                    .iter()
                    .zip(&ranks)
                    .filter(|(_, rank)| rank.is_none())
                    .map(|(record, _)| record.name().to_string())
                    .collect();
                return Err(ModuleSystemError::CircularDependency { modules: stuck });
            }
        }

        Ok(Ranking {
            ranks: ranks.into_iter().flatten().collect(),
        })
    }

    /// Compute ranks and write them into the records.
    pub fn assign(modules: &[Arc<ModuleRecord>]) -> Result<Ranking, ModuleSystemError> {
        let ranking = Self::compute(modules)?;
        for (position, record) in modules.iter().enumerate() {
            if let Some(rank) = ranking.rank(position) {
                record.set_rank(rank)?;
            }
        }
        log::debug!("Assigned ranks to {} modules", ranking.len());
        Ok(ranking)
    }

    /// Ranked names in ascending rank order, for display.
    pub fn plan(modules: &[Arc<ModuleRecord>]) -> Result<Vec<RankedModule>, ModuleSystemError> {
        let ranking = Self::compute(modules)?;
        Ok(ranking
            .ascending()
            .into_iter()
            .map(|position| RankedModule {
                name: modules[position].name().to_string(),
                rank: ranking.ranks[position],
            })
            .collect())
    }
}
