/// Dense contingency cube over every combination of dimension values.
///
/// `workspace` holds work-row mass and is rescaled in place while raking;
/// `initspace` is the snapshot taken right before raking starts.
/// `members[column][ordinal]` lists the cube offsets whose mixed-radix
/// decomposition selects that value, sorted and without duplicates once
/// the cube is sealed.
#[derive(Debug, Clone, Default)]
pub struct Cube {
    workspace: Vec<f64>,
    initspace: Vec<f64>,
    members: Vec<Vec<Vec<usize>>>,
    sealed: bool,
}

impl Cube {
    /// Allocates a zeroed cube of `len` cells for dimensions of the given sizes.
    pub fn new(len: usize, sizes: &[usize]) -> Self {
        Self {
            workspace: vec![0.0; len],
            initspace: Vec::new(),
            members: sizes.iter().map(|&size| vec![Vec::new(); size]).collect(),
            sealed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.workspace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspace.is_empty()
    }

    /// Adds one work row at `index`; `ordinals` is aligned with the columns.
    pub fn add_row(&mut self, index: usize, ordinals: &[usize]) {
        self.workspace[index] += 1.0;
        for (column, &ordinal) in ordinals.iter().enumerate() {
            self.members[column][ordinal].push(index);
        }
        self.sealed = false;
    }

    /// Deduplicates membership lists and snapshots the current mass.
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }
        for column in &mut self.members {
            for cells in column.iter_mut() {
                cells.sort_unstable();
                cells.dedup();
            }
        }
        self.initspace = self.workspace.clone();
        self.sealed = true;
    }

    pub fn workspace(&self) -> &[f64] {
        &self.workspace
    }

    pub fn initspace(&self) -> &[f64] {
        &self.initspace
    }

    pub fn members(&self, column: usize) -> &[Vec<usize>] {
        &self.members[column]
    }

    /// Mass currently held by every cell containing the value.
    pub fn marginal(&self, column: usize, ordinal: usize) -> f64 {
        self.members[column][ordinal]
            .iter()
            .map(|&cell| self.workspace[cell])
            .sum()
    }

    pub(crate) fn split_mut(&mut self) -> (&mut [f64], &[Vec<Vec<usize>>]) {
        (&mut self.workspace, &self.members)
    }
}
