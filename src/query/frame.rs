use std::sync::Arc;

use super::parse::Query;
use crate::errors::{DafError, DafResult};
use crate::store::DafReader;
use crate::types::{AxisLabels, VectorData};

/// A tabular result: one row per axis entry, one named column per query.
#[derive(Debug, Clone)]
pub struct Frame {
    axis: AxisLabels,
    columns: Vec<(String, VectorData)>,
}

impl Frame {
    pub fn axis(&self) -> &AxisLabels {
        &self.axis
    }

    pub fn columns(&self) -> &[(String, VectorData)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&VectorData> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, data)| data)
    }

    pub fn nrows(&self) -> usize {
        self.axis.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }
}

/// Evaluate a set of column queries sharing one axis into a [`Frame`].
///
/// Each column query must produce a vector over `axis`; a query given
/// without a leading `/` is interpreted relative to the axis (so `": age"`
/// reads the axis vector `age`).
pub fn get_frame(
    daf: &dyn DafReader,
    axis: &str,
    columns: &[(String, String)],
) -> DafResult<Frame> {
    let entries = daf.axis_entries(axis)?;
    let mut frame_columns = Vec::with_capacity(columns.len());
    for (name, text) in columns {
        let full_text = if text.trim_start().starts_with('/') {
            text.clone()
        } else {
            format!("/ {} {}", crate::query::tokens::escape_value(axis), text)
        };
        let query = Query::parse(&full_text)?;
        let vector = query.execute(daf)?.into_vector()?;
        if vector.axis().name() != axis {
            return Err(DafError::QueryEvaluationError {
                operation: full_text,
                reason: format!(
                    "the column: {} is over the axis: {} instead of the frame axis: {}",
                    name,
                    vector.axis().name(),
                    axis
                ),
            });
        }
        if vector.len() != entries.len() {
            return Err(DafError::QueryEvaluationError {
                operation: full_text,
                reason: format!(
                    "the column: {} has {} entries but the frame axis: {} has {}",
                    name,
                    vector.len(),
                    axis,
                    entries.len()
                ),
            });
        }
        frame_columns.push((name.clone(), vector.into_data()));
    }
    Ok(Frame {
        axis: AxisLabels::new(axis, Arc::clone(&entries)),
        columns: frame_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DafWriter, MemoryDaf};
    use crate::types::StorageScalar;

    #[test]
    fn test_frame_over_axis() {
        let daf = MemoryDaf::new("frame!");
        daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
            .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![3i64, 5, 7]), false)
            .unwrap();
        daf.set_vector(
            "cell",
            "type",
            VectorData::from(vec!["T", "B", "T"]),
            false,
        )
        .unwrap();

        let frame = get_frame(
            &daf,
            "cell",
            &[
                ("age".to_string(), ": age".to_string()),
                ("kind".to_string(), ": type".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(frame.nrows(), 3);
        assert_eq!(frame.ncols(), 2);
        assert_eq!(frame.column("age").unwrap().get(2), StorageScalar::Int64(7));
        assert_eq!(
            frame.column("kind").unwrap().get(1),
            StorageScalar::from("B")
        );
        assert!(frame.column("nope").is_none());
    }

    #[test]
    fn test_frame_rejects_foreign_axis() {
        let daf = MemoryDaf::new("frame!");
        daf.add_axis("cell", vec!["c0".into()]).unwrap();
        daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
        daf.set_vector("gene", "noise", VectorData::from(vec![0.1f32, 0.2]), false)
            .unwrap();
        let error = get_frame(
            &daf,
            "cell",
            &[("noise".to_string(), "/ gene : noise".to_string())],
        )
        .unwrap_err();
        assert!(error.to_string().contains("frame axis"));
    }
}
