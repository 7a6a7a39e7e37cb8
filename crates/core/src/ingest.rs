use crate::cube::Cube;
use crate::error::{RakeError, Result};
use crate::hypercube::{HyperCube, Phase};
use crate::options::Options;
use crate::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// Reference population whose marginals are the target.
    Goal,
    /// Population being reweighted.
    Work,
}

/// A response without the group column carries the empty group value.
pub fn classify(options: &Options, response: &Response) -> Result<Group> {
    let value = response.value(&options.group_column).unwrap_or("");
    if value == options.goal_group_value {
        Ok(Group::Goal)
    } else if value == options.work_group_value {
        Ok(Group::Work)
    } else {
        Err(RakeError::InvalidGroupValue {
            column: options.group_column.clone(),
            value: value.to_string(),
        })
    }
}

impl HyperCube {
    /// Adds every response to the goal sums or, for work rows, to the cube.
    ///
    /// The first call freezes the dimension sizes discovered so far and
    /// allocates the cube.
    pub fn ingest(&mut self, responses: &[Response]) -> Result<()> {
        match self.phase {
            Phase::Discovering => self.allocate()?,
            Phase::Ingested => {}
            Phase::Raked => {
                return Err(RakeError::InvalidState("cannot ingest into a raked cube"));
            }
        }
        for response in responses {
            self.ingest_response(response)?;
        }
        self.cube.seal();
        tracing::debug!(
            work_rows = self.work_row_count,
            goal_rows = self.goal_rows,
            "ingested responses"
        );
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        let len = self.registry.compute_block_sizes()?;
        self.cube = Cube::new(len, &self.registry.sizes());
        self.phase = Phase::Ingested;
        tracing::debug!(cells = len, "allocated cube");
        Ok(())
    }

    fn ingest_response(&mut self, response: &Response) -> Result<Group> {
        let group = classify(&self.options, response)?;

        let mut ordinals = Vec::with_capacity(self.registry.len());
        let mut raw = Vec::with_capacity(self.registry.len());
        for (column, dimension) in self.registry.dimensions().iter().enumerate() {
            // a missing column reads as the empty value, which discovery never registers
            let value = response.value(&dimension.column).unwrap_or("");
            ordinals.push(self.registry.ordinal(column, value)?);
            raw.push(value.to_string());
        }
        let index = self.registry.offset(&ordinals)?;

        match group {
            Group::Work => {
                for (column, &ordinal) in ordinals.iter().enumerate() {
                    if let Some(value) = self.registry.value_mut(column, ordinal) {
                        value.initial += 1;
                        value.work_sum += 1.0;
                    }
                    self.registry.dimensions_mut()[column].initial += 1;
                }
                self.cube.add_row(index, &ordinals);
                if self
                    .work_rows
                    .insert(response.respondent_id.clone(), raw)
                    .is_some()
                {
                    tracing::warn!(
                        respondent = %response.respondent_id,
                        "duplicate work respondent id, keeping the latest values"
                    );
                }
                self.work_row_count += 1;
            }
            Group::Goal => {
                for (column, &ordinal) in ordinals.iter().enumerate() {
                    if let Some(value) = self.registry.value_mut(column, ordinal) {
                        value.goal_sum += 1.0;
                    }
                }
                self.goal_rows += 1;
            }
        }
        Ok(group)
    }
}
