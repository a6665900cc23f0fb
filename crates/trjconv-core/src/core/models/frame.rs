use super::atom::Atom;
use super::units::LengthUnit;
use nalgebra::{Point3, Vector3};

/// Box edges below this length are treated as "no box".
const ZERO_BOX_EPSILON: f64 = 1e-8;

/// Simulation step index and time of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestep {
    pub step: u64,
    /// Simulation time in picoseconds.
    pub time_ps: f64,
}

impl Timestep {
    pub fn new(step: u64, time_ps: f64) -> Self {
        Self { step, time_ps }
    }
}

/// One snapshot of a molecular system.
///
/// The atom count of a frame is always `atoms.len()`; codecs that read a
/// different declared count report the disagreement and trust the atoms they
/// actually parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Title or comment line.
    pub title: String,
    /// Atoms in file order. Order is identity across formats.
    pub atoms: Vec<Atom>,
    /// Orthorhombic cell edge lengths. `None` means no periodicity.
    pub box_vector: Option<Vector3<f64>>,
    pub timestep: Option<Timestep>,
    /// Unit of `position`, `velocity` and `box_vector`.
    pub unit: LengthUnit,
}

impl Frame {
    pub fn new(title: &str, unit: LengthUnit) -> Self {
        Self {
            title: title.to_string(),
            atoms: Vec::new(),
            box_vector: None,
            timestep: None,
            unit,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Returns the box vector only if it describes a real periodic cell:
    /// every edge finite and strictly positive.
    pub fn periodic_box(&self) -> Option<Vector3<f64>> {
        self.box_vector
            .filter(|b| b.iter().all(|edge| edge.is_finite() && *edge > ZERO_BOX_EPSILON))
    }

    /// Returns the box vector unless every edge is zero.
    pub fn written_box(&self) -> Option<Vector3<f64>> {
        self.box_vector
            .filter(|b| b.iter().any(|edge| edge.abs() > ZERO_BOX_EPSILON))
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Overwrites atom positions in order.
    ///
    /// # Panics
    ///
    /// Panics if `positions` and the atom list differ in length; callers
    /// derive `positions` from this very frame.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) {
        assert_eq!(
            positions.len(),
            self.atoms.len(),
            "position count must match atom count"
        );
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
    }

    /// Rescales positions, velocities and the box vector into `target`.
    ///
    /// Does nothing when the frame is already expressed in `target`, so the
    /// factor is applied exactly once however often this is called.
    pub fn convert_units(&mut self, target: LengthUnit) {
        if self.unit == target {
            return;
        }
        let factor = self.unit.factor_to(target);
        for atom in &mut self.atoms {
            atom.position.coords *= factor;
            if let Some(velocity) = atom.velocity.as_mut() {
                *velocity *= factor;
            }
        }
        if let Some(box_vector) = self.box_vector.as_mut() {
            *box_vector *= factor;
        }
        self.unit = target;
    }

    /// Replaces every velocity with an explicit zero vector.
    pub fn zero_velocities(&mut self) {
        for atom in &mut self.atoms {
            atom.velocity = Some(Vector3::zeros());
        }
    }

    pub fn clear_velocities(&mut self) {
        for atom in &mut self.atoms {
            atom.velocity = None;
        }
    }

    /// Index of the atom carrying `serial`, if any.
    pub fn index_of_serial(&self, serial: usize) -> Option<usize> {
        // Serials are almost always 1..=n in order, try that first.
        match self.atoms.get(serial.wrapping_sub(1)) {
            Some(atom) if atom.serial == serial => Some(serial - 1),
            _ => self.atoms.iter().position(|a| a.serial == serial),
        }
    }
}

/// An ordered series of frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    frames: Vec<Frame>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl From<Vec<Frame>> for Trajectory {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl IntoIterator for Trajectory {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
