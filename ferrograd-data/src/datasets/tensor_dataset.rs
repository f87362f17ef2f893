use ferrograd_core::buffer::HostData;
use ferrograd_core::{FerrogradError, Result, Tensor};

use super::traits::Dataset;

/// A dataset over one or more tensors sharing their first dimension.
///
/// Sample `i` is row `i` of every tensor, each a fresh tensor with the
/// leading dimension removed, allocated on the source tensor's device and pool.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    tensors: Vec<Tensor>,
    length: usize,
}

impl TensorDataset {
    /// # Errors
    ///
    /// `ShapeMismatch` if a tensor is a scalar or the first dimensions differ.
    pub fn new(tensors: Vec<Tensor>) -> Result<Self> {
        let mut length = None;
        for tensor in &tensors {
            let rows = match tensor.shape().first() {
                Some(rows) => *rows,
                None => {
                    return Err(FerrogradError::ShapeMismatch {
                        expected: vec![length.unwrap_or(0)],
                        actual: Vec::new(),
                        operation: "TensorDataset::new".to_string(),
                    })
                }
            };
            match length {
                None => length = Some(rows),
                Some(expected) if expected != rows => {
                    return Err(FerrogradError::ShapeMismatch {
                        expected: vec![expected],
                        actual: tensor.shape().to_vec(),
                        operation: "TensorDataset::new".to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            tensors,
            length: length.unwrap_or(0),
        })
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }
}

/// Copies row `index` of `tensor` into a new tensor of shape `shape[1..]`.
fn row(tensor: &Tensor, index: usize) -> Result<Tensor> {
    let shape = tensor.shape()[1..].to_vec();
    let width: usize = shape.iter().product();
    let range = index * width..(index + 1) * width;
    let data = match tensor.host_data() {
        HostData::F32(v) => HostData::F32(v[range].to_vec()),
        HostData::F64(v) => HostData::F64(v[range].to_vec()),
    };
    tensor.like(data, shape)
}

impl Dataset for TensorDataset {
    type Item = Vec<Tensor>;

    fn get(&self, index: usize) -> Result<Self::Item> {
        if index >= self.length {
            return Err(FerrogradError::IndexOutOfBounds {
                index: vec![index],
                shape: vec![self.length],
            });
        }
        self.tensors.iter().map(|t| row(t, index)).collect()
    }

    fn len(&self) -> usize {
        self.length
    }
}

#[cfg(test)]
#[path = "tensor_dataset_test.rs"]
mod tests;
