use crate::core::models::frame::Frame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The unit that is kept whole when coordinates are re-imaged into the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// Every atom is wrapped on its own.
    #[default]
    Atom,
    /// Atoms of one residue stay together.
    #[serde(alias = "res")]
    Residue,
    /// Atoms of one bonded molecule stay together.
    #[serde(alias = "mol")]
    Molecule,
}

impl Granularity {
    /// Value of the `-pbc` option understood by `gmx trjconv`.
    pub fn gmx_flag(self) -> &'static str {
        match self {
            Self::Atom => "atom",
            Self::Residue => "res",
            Self::Molecule => "mol",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Atom => "atom",
            Self::Residue => "residue",
            Self::Molecule => "molecule",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown PBC granularity '{0}' (expected atom, res or mol)")]
pub struct ParseGranularityError(String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atom" => Ok(Self::Atom),
            "res" | "residue" => Ok(Self::Residue),
            "mol" | "molecule" => Ok(Self::Molecule),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

/// Disjoint-set forest over `0..n` with path compression and union by size.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merges the sets of `a` and `b`; returns `false` if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    /// All sets, each sorted ascending, ordered by their lowest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..self.len() {
            let root = self.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(i);
        }
        groups
    }
}

fn serial_index(frame: &Frame) -> HashMap<usize, usize> {
    frame
        .atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| (atom.serial, i))
        .collect()
}

/// Joins every bonded pair; neighbors naming no atom of the frame are ignored.
fn union_bonds(frame: &Frame, forest: &mut UnionFind) {
    let index = serial_index(frame);
    for (i, atom) in frame.atoms.iter().enumerate() {
        for neighbor in &atom.neighbors {
            if let Some(&j) = index.get(neighbor) {
                forest.union(i, j);
            }
        }
    }
}

/// Connected components of the bond graph, as atom indices.
pub fn connectivity_groups(frame: &Frame) -> Vec<Vec<usize>> {
    let mut forest = UnionFind::new(frame.atom_count());
    union_bonds(frame, &mut forest);
    forest.groups()
}

/// Runs of consecutive atoms sharing a residue number and name, when every
/// atom carries a residue assignment.
fn explicit_residue_groups(frame: &Frame) -> Option<Vec<Vec<usize>>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut previous = None;
    for (i, atom) in frame.atoms.iter().enumerate() {
        let residue = atom.residue.as_ref()?;
        match groups.last_mut() {
            Some(group) if previous == Some(residue) => group.push(i),
            _ => groups.push(vec![i]),
        }
        previous = Some(residue);
    }
    Some(groups)
}

/// Residue groups: explicit residue runs when present, otherwise bonded
/// components.
pub fn residue_groups(frame: &Frame) -> Vec<Vec<usize>> {
    if frame.atoms.is_empty() {
        return Vec::new();
    }
    explicit_residue_groups(frame).unwrap_or_else(|| connectivity_groups(frame))
}

/// Molecule groups: residues joined by any bond path.
pub fn molecule_groups(frame: &Frame) -> Vec<Vec<usize>> {
    let mut forest = UnionFind::new(frame.atom_count());
    union_bonds(frame, &mut forest);
    for group in explicit_residue_groups(frame).unwrap_or_default() {
        for pair in group.windows(2) {
            forest.union(pair[0], pair[1]);
        }
    }
    forest.groups()
}

/// Atom index groups that must move as one unit under `granularity`.
pub fn groups_for(frame: &Frame, granularity: Granularity) -> Vec<Vec<usize>> {
    match granularity {
        Granularity::Atom => (0..frame.atom_count()).map(|i| vec![i]).collect(),
        Granularity::Residue => residue_groups(frame),
        Granularity::Molecule => molecule_groups(frame),
    }
}
