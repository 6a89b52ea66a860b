//! Tagged JSON encoding for numeric arrays.
//!
//! Matrices are written as `{"__array__": true, "shape": [rows, cols], "data": [...]}`
//! with `data` in row-major order. The explicit tag keeps a decoder from
//! confusing a persisted matrix with an ordinary list.
//!
//! Use with `#[serde(with = "crate::schema::array")]` on `DMatrix<T>` fields,
//! or the [`option`] / [`option_list`] submodules for optional fields.

use nalgebra::{DMatrix, Scalar};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Serialize, Deserialize)]
struct TaggedArray<T> {
    #[serde(rename = "__array__")]
    tag: bool,
    shape: [usize; 2],
    data: Vec<T>,
}

impl<T: Scalar> TaggedArray<T> {
    fn encode(matrix: &DMatrix<T>) -> Self {
        // Transposing a column-major matrix yields its row-major element order.
        let data = matrix.transpose().as_slice().to_vec();
        Self {
            tag: true,
            shape: [matrix.nrows(), matrix.ncols()],
            data,
        }
    }

    fn decode<E: serde::de::Error>(self) -> Result<DMatrix<T>, E> {
        if !self.tag {
            return Err(E::custom("value is not tagged as a numeric array"));
        }
        let [rows, cols] = self.shape;
        if rows * cols != self.data.len() {
            return Err(E::custom(format!(
                "array shape {rows}x{cols} does not match {} data elements",
                self.data.len()
            )));
        }
        Ok(DMatrix::from_row_slice(rows, cols, &self.data))
    }
}

pub fn serialize<T, S>(matrix: &DMatrix<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Scalar + Serialize,
    S: Serializer,
{
    TaggedArray::encode(matrix).serialize(serializer)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<DMatrix<T>, D::Error>
where
    T: Scalar + Deserialize<'de>,
    D: Deserializer<'de>,
{
    TaggedArray::<T>::deserialize(deserializer)?.decode()
}

/// Tagged encoding for `Option<DMatrix<T>>`; `None` is written as `null`.
pub mod option {
    use super::*;

    pub fn serialize<T, S>(matrix: &Option<DMatrix<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Scalar + Serialize,
        S: Serializer,
    {
        matrix
            .as_ref()
            .map(TaggedArray::encode)
            .serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<DMatrix<T>>, D::Error>
    where
        T: Scalar + Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<TaggedArray<T>>::deserialize(deserializer)?
            .map(TaggedArray::decode)
            .transpose()
    }
}

/// Tagged encoding for `Option<Vec<DMatrix<T>>>` (one matrix per load case).
pub mod option_list {
    use super::*;

    pub fn serialize<T, S>(
        matrices: &Option<Vec<DMatrix<T>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        T: Scalar + Serialize,
        S: Serializer,
    {
        matrices
            .as_ref()
            .map(|list| list.iter().map(TaggedArray::encode).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Vec<DMatrix<T>>>, D::Error>
    where
        T: Scalar + Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<Vec<TaggedArray<T>>>::deserialize(deserializer)?
            .map(|list| list.into_iter().map(TaggedArray::decode).collect())
            .transpose()
    }
}
