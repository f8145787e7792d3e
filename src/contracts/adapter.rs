use std::sync::Arc;

use super::copy::{copy_all, CopyOptions};
use crate::errors::DafResult;
use crate::store::{DafReader, DafWriter, MemoryDaf};
use crate::types::StorageScalar;
use crate::wrappers::{read_only, ChainWriter, DafView, ViewSpec};

/// Options of [`adapter`].
#[derive(Debug, Clone, Default)]
pub struct AdapterOptions {
    /// Replace existing base properties during the write-back.
    pub overwrite: bool,
    /// Also persist the flipped layout of every written-back matrix.
    pub relayout: bool,
    /// Fill value for base entries outside a subsetted input axis.
    pub empty: Option<StorageScalar>,
}

/// Run a computation against a renamed/subsetted rendition of a base store
/// and write its outputs back, renamed again, into the base:
///
/// 1. build a read-only view of the base applying the input specification;
/// 2. build an empty in-memory capture store;
/// 3. chain the two into a writable store (reads fall through to the view,
///    writes land in the capture store);
/// 4. run the computation on the chain;
/// 5. build a view of the chain applying the output specification;
/// 6. copy that output view into the base with the caller's options;
/// 7. hand back whatever the computation returned (the capture store is
///    dropped).
pub fn adapter<W, R>(
    base: &Arc<W>,
    input: &ViewSpec,
    output: &ViewSpec,
    options: &AdapterOptions,
    computation: impl FnOnce(&dyn DafWriter) -> DafResult<R>,
) -> DafResult<R>
where
    W: DafWriter + 'static,
{
    let base_reader: Arc<dyn DafReader> = Arc::clone(base) as Arc<dyn DafReader>;
    let input_view = DafView::with_name(
        format!("{}.adapter.input", base.name()),
        read_only(base_reader),
        input,
    )?;

    let capture: Arc<dyn DafWriter> =
        Arc::new(MemoryDaf::new(format!("{}.adapter.capture", base.name())));
    let chain = Arc::new(ChainWriter::with_name(
        format!("{}.adapter", base.name()),
        vec![Arc::new(input_view) as Arc<dyn DafReader>],
        capture,
    )?);

    let result = computation(chain.as_ref())?;

    let output_view = DafView::with_name(
        format!("{}.adapter.output", base.name()),
        Arc::clone(&chain) as Arc<dyn DafReader>,
        output,
    )?;
    copy_all(
        &output_view,
        base.as_ref(),
        &CopyOptions {
            overwrite: options.overwrite,
            relayout: options.relayout,
            empty: options.empty.clone(),
        },
    )?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DafError;
    use crate::types::VectorData;

    fn base() -> Arc<MemoryDaf> {
        let daf = MemoryDaf::new("base!");
        daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
            .unwrap();
        daf.set_vector(
            "cell",
            "donor",
            VectorData::from(vec!["d0", "d1", "d0"]),
            false,
        )
        .unwrap();
        Arc::new(daf)
    }

    #[test]
    fn test_adapter_round_trip() {
        let base = base();
        let input = ViewSpec::new()
            .axis("cell", "=")
            .vector("cell", "subject", "donor");
        let output = ViewSpec::new()
            .axis("cell", "=")
            .vector("cell", "quality", "score");

        let result = adapter(
            &base,
            &input,
            &output,
            &AdapterOptions::default(),
            |adapted| {
                // The computation sees the renamed input...
                let subjects = adapted.get_vector("cell", "subject")?;
                assert_eq!(subjects.data().get(1), StorageScalar::from("d1"));
                // ...and the base name is hidden.
                assert!(!adapted.has_vector("cell", "donor")?);
                // It produces its own output under its own name.
                adapted.set_vector(
                    "cell",
                    "score",
                    VectorData::from(vec![0.1f64, 0.2, 0.3]),
                    false,
                )?;
                Ok(42)
            },
        )
        .unwrap();
        assert_eq!(result, 42);

        // The base gained the renamed output and is otherwise unchanged.
        assert!(base.has_vector("cell", "quality").unwrap());
        assert!(!base.has_vector("cell", "score").unwrap());
        assert!(!base.has_vector("cell", "subject").unwrap());
        assert_eq!(
            base.get_vector("cell", "quality").unwrap().data().get(2),
            StorageScalar::Float64(0.3)
        );
        assert_eq!(base.vector_names("cell").unwrap(), vec!["donor", "quality"]);
    }

    #[test]
    fn test_adapter_does_not_leak_capture_writes() {
        let base = base();
        let input = ViewSpec::new().axis("cell", "=").vector("cell", "*", "=");
        // The output view exposes nothing, so nothing is written back.
        let output = ViewSpec::new();

        adapter(
            &base,
            &input,
            &output,
            &AdapterOptions::default(),
            |adapted| {
                adapted.set_scalar("scratch", StorageScalar::Bool(true), false)?;
                Ok(())
            },
        )
        .unwrap();
        assert!(!base.has_scalar("scratch").unwrap());
    }

    #[test]
    fn test_adapter_computation_errors_propagate() {
        let base = base();
        let result: DafResult<()> = adapter(
            &base,
            &ViewSpec::new().axis("cell", "="),
            &ViewSpec::new(),
            &AdapterOptions::default(),
            |adapted| {
                adapted.get_scalar("nope")?;
                Ok(())
            },
        );
        assert!(matches!(result, Err(DafError::UnknownScalar { .. })));
    }
}
