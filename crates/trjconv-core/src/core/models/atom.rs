use nalgebra::{Point3, Vector3};

/// Residue assignment carried by GROMACS formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResidueInfo {
    /// The residue sequence number as written in the file.
    pub number: i64,
    /// The residue name (e.g., "SOL", "MOL").
    pub name: String,
}

impl ResidueInfo {
    pub fn new(number: i64, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
        }
    }
}

/// Represents a single atom of a frame.
///
/// The same struct is shared by every format; fields a format cannot express
/// are left at their defaults (`atom_type` of 0, no neighbors, no residue).
/// Atom identity across formats is positional: the serial is only meaningful
/// inside the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The 1-based serial number as written in the source file.
    pub serial: usize,
    /// The atom name (e.g., "O", "HW1", "CA").
    pub name: String,
    /// The Tinker force field atom type.
    pub atom_type: i32,
    /// The Cartesian position, in the owning frame's length unit.
    pub position: Point3<f64>,
    /// The velocity, in the owning frame's length unit per picosecond.
    pub velocity: Option<Vector3<f64>>,
    /// Serials of bonded neighbor atoms, in file order.
    pub neighbors: Vec<usize>,
    /// Residue assignment, when the format provides one.
    pub residue: Option<ResidueInfo>,
}

impl Atom {
    /// Creates a new `Atom` with default values for the optional fields.
    ///
    /// # Arguments
    ///
    /// * `serial` - The 1-based serial number of the atom.
    /// * `name` - The name of the atom.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(serial: usize, name: &str, position: Point3<f64>) -> Self {
        Self {
            serial,
            name: name.to_string(),
            atom_type: 0,
            position,
            velocity: None,
            neighbors: Vec::new(),
            residue: None,
        }
    }

    pub fn with_type(mut self, atom_type: i32) -> Self {
        self.atom_type = atom_type;
        self
    }

    pub fn with_neighbors(mut self, neighbors: Vec<usize>) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn with_residue(mut self, residue: ResidueInfo) -> Self {
        self.residue = Some(residue);
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let atom = Atom::new(7, "OW", Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.serial, 7);
        assert_eq!(atom.name, "OW");
        assert_eq!(atom.atom_type, 0);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert!(atom.velocity.is_none());
        assert!(atom.neighbors.is_empty());
        assert!(atom.residue.is_none());
    }

    #[test]
    fn builder_methods_set_optional_fields() {
        let atom = Atom::new(1, "O", Point3::origin())
            .with_type(63)
            .with_neighbors(vec![2, 3])
            .with_residue(ResidueInfo::new(4, "SOL"))
            .with_velocity(Vector3::new(0.1, 0.0, -0.1));

        assert_eq!(atom.atom_type, 63);
        assert_eq!(atom.neighbors, vec![2, 3]);
        assert_eq!(atom.residue, Some(ResidueInfo::new(4, "SOL")));
        assert_eq!(atom.velocity, Some(Vector3::new(0.1, 0.0, -0.1)));
    }

    #[test]
    fn atom_equality_and_clone_works() {
        let atom1 = Atom::new(1, "N", Point3::new(0.0, 0.0, 0.0)).with_neighbors(vec![2]);
        let atom2 = atom1.clone();
        assert_eq!(atom1, atom2);
    }
}
