use crate::errors::{DafError, DafResult};
use crate::store::DafReader;
use crate::types::ElementType;

/// What a computation promises about one property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Must exist before the computation runs.
    RequiredInput,
    /// May exist before; type-checked when present.
    OptionalInput,
    /// Must exist after the computation (either passed in or produced).
    RequiredOutput,
    /// May exist after; type-checked when present.
    OptionalOutput,
    /// Will exist after the computation, produced by it.
    GuaranteedOutput,
    /// May be produced, depending on the inputs.
    ContingentOutput,
}

impl Expectation {
    pub fn is_input(self) -> bool {
        matches!(self, Expectation::RequiredInput | Expectation::OptionalInput)
    }

    pub fn name(self) -> &'static str {
        match self {
            Expectation::RequiredInput => "RequiredInput",
            Expectation::OptionalInput => "OptionalInput",
            Expectation::RequiredOutput => "RequiredOutput",
            Expectation::OptionalOutput => "OptionalOutput",
            Expectation::GuaranteedOutput => "GuaranteedOutput",
            Expectation::ContingentOutput => "ContingentOutput",
        }
    }
}

/// The property a contract entry talks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractKey {
    Scalar(String),
    /// `(axis, vector)`.
    Vector(String, String),
    /// `(rows, columns, matrix)`.
    Matrix(String, String, String),
    /// `(main_axis, rows, columns, tensor)`: one matrix per entry of the
    /// main axis, named `<entry>_<tensor>`.
    Tensor(String, String, String, String),
}

impl std::fmt::Display for ContractKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractKey::Scalar(name) => write!(f, "scalar: {}", name),
            ContractKey::Vector(axis, name) => write!(f, "vector: {}/{}", axis, name),
            ContractKey::Matrix(rows, columns, name) => {
                write!(f, "matrix: {}/{}/{}", rows, columns, name)
            }
            ContractKey::Tensor(main, rows, columns, name) => {
                write!(f, "tensor: {};{}/{}/{}", main, rows, columns, name)
            }
        }
    }
}

/// The element types a contract entry accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataTypeSpec {
    Exactly(ElementType),
    OneOf(Vec<ElementType>),
    AnyNumeric,
    AnyStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeCategory {
    Bool,
    Integer,
    Float,
    Text,
}

fn category_of(element_type: ElementType) -> TypeCategory {
    if element_type == ElementType::Bool {
        TypeCategory::Bool
    } else if element_type.is_integer() {
        TypeCategory::Integer
    } else if element_type.is_float() {
        TypeCategory::Float
    } else {
        TypeCategory::Text
    }
}

impl DataTypeSpec {
    /// Scalar types compare exactly; vector/matrix element types subsume
    /// their declared category (any integer width satisfies an integer
    /// declaration, any float width a float one).
    fn accepts(&self, actual: ElementType, exact: bool) -> bool {
        match self {
            DataTypeSpec::AnyStorage => true,
            DataTypeSpec::AnyNumeric => actual.is_numeric(),
            DataTypeSpec::Exactly(expected) => {
                if exact {
                    actual == *expected
                } else {
                    category_of(actual) == category_of(*expected)
                }
            }
            DataTypeSpec::OneOf(allowed) => {
                if exact {
                    allowed.contains(&actual)
                } else {
                    allowed
                        .iter()
                        .any(|expected| category_of(actual) == category_of(*expected))
                }
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            DataTypeSpec::Exactly(element_type) => element_type.to_string(),
            DataTypeSpec::OneOf(allowed) => allowed
                .iter()
                .map(|element_type| element_type.name())
                .collect::<Vec<_>>()
                .join(" | "),
            DataTypeSpec::AnyNumeric => "any numeric".to_string(),
            DataTypeSpec::AnyStorage => "any".to_string(),
        }
    }
}

/// One slot of a contract.
#[derive(Debug, Clone)]
pub struct ContractEntry {
    pub key: ContractKey,
    pub expectation: Expectation,
    pub data_type: DataTypeSpec,
    pub doc: Option<String>,
}

/// The property set a computation consumes and produces.
#[derive(Debug, Clone, Default)]
pub struct Contract {
    entries: Vec<ContractEntry>,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(
        mut self,
        key: ContractKey,
        expectation: Expectation,
        data_type: DataTypeSpec,
        doc: impl Into<Option<String>>,
    ) -> Self {
        self.entries.push(ContractEntry {
            key,
            expectation,
            data_type,
            doc: doc.into(),
        });
        self
    }

    pub fn required_input(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::RequiredInput, data_type, None)
    }

    pub fn optional_input(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::OptionalInput, data_type, None)
    }

    pub fn required_output(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::RequiredOutput, data_type, None)
    }

    pub fn optional_output(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::OptionalOutput, data_type, None)
    }

    pub fn guaranteed_output(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::GuaranteedOutput, data_type, None)
    }

    pub fn contingent_output(self, key: ContractKey, data_type: DataTypeSpec) -> Self {
        self.entry(key, Expectation::ContingentOutput, data_type, None)
    }

    pub fn entries(&self) -> &[ContractEntry] {
        &self.entries
    }
}

fn violation(
    computation: &str,
    direction: &str,
    key: &ContractKey,
    reason: impl Into<String>,
) -> DafError {
    DafError::ContractViolation {
        computation: computation.to_string(),
        direction: direction.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Whether one concrete property exists, and its element type when it does.
fn probe(
    daf: &dyn DafReader,
    key: &ContractKey,
) -> DafResult<Vec<(String, Option<ElementType>)>> {
    match key {
        ContractKey::Scalar(name) => {
            let element_type = if daf.has_scalar(name)? {
                Some(daf.get_scalar(name)?.element_type())
            } else {
                None
            };
            Ok(vec![(name.clone(), element_type)])
        }
        ContractKey::Vector(axis, name) => {
            let element_type = if daf.has_axis(axis)? && daf.has_vector(axis, name)? {
                Some(daf.get_vector(axis, name)?.element_type())
            } else {
                None
            };
            Ok(vec![(format!("{}/{}", axis, name), element_type)])
        }
        ContractKey::Matrix(rows_axis, columns_axis, name) => {
            let element_type = if daf.has_axis(rows_axis)?
                && daf.has_axis(columns_axis)?
                && daf.has_matrix(rows_axis, columns_axis, name)?
            {
                Some(daf.get_matrix(rows_axis, columns_axis, name)?.element_type())
            } else {
                None
            };
            Ok(vec![(
                format!("{}/{}/{}", rows_axis, columns_axis, name),
                element_type,
            )])
        }
        ContractKey::Tensor(main_axis, rows_axis, columns_axis, name) => {
            if !daf.has_axis(main_axis)? {
                return Ok(vec![(format!("{};{}", main_axis, name), None)]);
            }
            let mut probes = Vec::new();
            for entry in daf.axis_entries(main_axis)?.iter() {
                let matrix_name = format!("{}_{}", entry, name);
                let exists = daf.has_axis(rows_axis)?
                    && daf.has_axis(columns_axis)?
                    && daf.has_matrix(rows_axis, columns_axis, &matrix_name)?;
                let element_type = if exists {
                    Some(
                        daf.get_matrix(rows_axis, columns_axis, &matrix_name)?
                            .element_type(),
                    )
                } else {
                    None
                };
                probes.push((
                    format!("{}/{}/{}", rows_axis, columns_axis, matrix_name),
                    element_type,
                ));
            }
            Ok(probes)
        }
    }
}

fn verify_entry(
    entry: &ContractEntry,
    daf: &dyn DafReader,
    computation: &str,
    direction: &str,
    must_exist: bool,
) -> DafResult<()> {
    let exact = matches!(entry.key, ContractKey::Scalar(_));
    for (located, element_type) in probe(daf, &entry.key)? {
        match element_type {
            None if must_exist => {
                return Err(violation(
                    computation,
                    direction,
                    &entry.key,
                    format!("missing {} ({})", located, entry.expectation.name()),
                ))
            }
            None => {}
            Some(actual) => {
                if !entry.data_type.accepts(actual, exact) {
                    return Err(violation(
                        computation,
                        direction,
                        &entry.key,
                        format!(
                            "{} has the element type: {} instead of: {}",
                            located,
                            actual,
                            entry.data_type.describe()
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Check the input side of a contract, before any user code runs.
pub fn verify_input(contract: &Contract, daf: &dyn DafReader, computation: &str) -> DafResult<()> {
    for entry in contract.entries() {
        match entry.expectation {
            Expectation::RequiredInput => verify_entry(entry, daf, computation, "input", true)?,
            Expectation::OptionalInput => verify_entry(entry, daf, computation, "input", false)?,
            _ => {}
        }
    }
    Ok(())
}

/// Check the output side of a contract, after the user code ran.
pub fn verify_output(contract: &Contract, daf: &dyn DafReader, computation: &str) -> DafResult<()> {
    for entry in contract.entries() {
        match entry.expectation {
            Expectation::RequiredOutput | Expectation::GuaranteedOutput => {
                verify_entry(entry, daf, computation, "output", true)?
            }
            Expectation::OptionalOutput | Expectation::ContingentOutput => {
                verify_entry(entry, daf, computation, "output", false)?
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DafWriter, MemoryDaf};
    use crate::types::{StorageScalar, VectorData};

    fn sample() -> MemoryDaf {
        let daf = MemoryDaf::new("contract!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1i32, 2]), false)
            .unwrap();
        daf
    }

    #[test]
    fn test_required_input_present() {
        let daf = sample();
        let contract = Contract::new()
            .required_input(
                ContractKey::Scalar("organism".into()),
                DataTypeSpec::Exactly(ElementType::String),
            )
            .required_input(
                ContractKey::Vector("cell".into(), "age".into()),
                DataTypeSpec::Exactly(ElementType::Int64),
            );
        // Int32 satisfies an integer-category vector declaration.
        verify_input(&contract, &daf, "test").unwrap();
    }

    #[test]
    fn test_missing_required_input() {
        let daf = MemoryDaf::new("empty!");
        let contract = Contract::new().required_input(
            ContractKey::Scalar("organism".into()),
            DataTypeSpec::Exactly(ElementType::String),
        );
        let error = verify_input(&contract, &daf, "test").unwrap_err();
        let text = error.to_string();
        assert!(text.contains("organism"));
        assert!(text.contains("RequiredInput"));
    }

    #[test]
    fn test_scalar_type_is_exact() {
        let daf = sample();
        let contract = Contract::new().required_input(
            ContractKey::Scalar("organism".into()),
            DataTypeSpec::Exactly(ElementType::Int64),
        );
        assert!(matches!(
            verify_input(&contract, &daf, "test"),
            Err(DafError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_vector_type_category_mismatch() {
        let daf = sample();
        let contract = Contract::new().required_input(
            ContractKey::Vector("cell".into(), "age".into()),
            DataTypeSpec::Exactly(ElementType::String),
        );
        assert!(verify_input(&contract, &daf, "test").is_err());
    }

    #[test]
    fn test_guaranteed_output() {
        let daf = sample();
        let contract = Contract::new().guaranteed_output(
            ContractKey::Vector("cell".into(), "score".into()),
            DataTypeSpec::AnyNumeric,
        );
        assert!(verify_output(&contract, &daf, "test").is_err());
        daf.set_vector("cell", "score", VectorData::from(vec![0.5f32, 0.7]), false)
            .unwrap();
        verify_output(&contract, &daf, "test").unwrap();
    }

    #[test]
    fn test_optional_input_checked_when_present() {
        let daf = sample();
        let contract = Contract::new().optional_input(
            ContractKey::Vector("cell".into(), "age".into()),
            DataTypeSpec::Exactly(ElementType::Float32),
        );
        assert!(verify_input(&contract, &daf, "test").is_err());

        let absent = Contract::new().optional_input(
            ContractKey::Vector("cell".into(), "missing".into()),
            DataTypeSpec::AnyStorage,
        );
        verify_input(&absent, &daf, "test").unwrap();
    }

    #[test]
    fn test_tensor_key() {
        let daf = sample();
        daf.add_axis("batch", vec!["b0".into(), "b1".into()]).unwrap();
        let contract = Contract::new().required_input(
            ContractKey::Tensor("batch".into(), "cell".into(), "cell".into(), "links".into()),
            DataTypeSpec::AnyNumeric,
        );
        assert!(verify_input(&contract, &daf, "test").is_err());

        use crate::types::{DenseMatrix, MatrixData};
        for name in ["b0_links", "b1_links"] {
            let matrix = DenseMatrix::from_rows(
                ElementType::Float32,
                &[vec![0.0, 1.0], vec![1.0, 0.0]],
            )
            .unwrap();
            daf.set_matrix("cell", "cell", name, MatrixData::Dense(matrix), false)
                .unwrap();
        }
        verify_input(&contract, &daf, "test").unwrap();
    }
}
