//! Host-side datasets and their on-disk `.npy` layout.
//!
//! A dataset directory holds five arrays:
//!
//! | file                | shape       |
//! |---------------------|-------------|
//! | `train_data.npy`    | `[T, N, F]` |
//! | `train_labels.npy`  | `[T, N, P]` |
//! | `test_data.npy`     | `[T', N, F]`|
//! | `test_labels.npy`   | `[T', N, P]`|
//! | `adjacency.npy`     | `[N, N]`    |

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use menucast_core::error::{ForecastError, Result};
use ndarray::{Array2, Array3};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

pub const TRAIN_DATA_FILE: &str = "train_data.npy";
pub const TRAIN_LABELS_FILE: &str = "train_labels.npy";
pub const TEST_DATA_FILE: &str = "test_data.npy";
pub const TEST_LABELS_FILE: &str = "test_labels.npy";
pub const ADJACENCY_FILE: &str = "adjacency.npy";

/// Node features `[T, N, F]` paired with targets `[T, N, P]`.
#[derive(Debug, Clone)]
pub struct Split {
    pub data: Array3<f32>,
    pub labels: Array3<f32>,
}

impl Split {
    pub fn new(data: Array3<f32>, labels: Array3<f32>) -> Result<Self> {
        let (t, n, _) = data.dim();
        let (lt, ln, _) = labels.dim();
        if t != lt || n != ln {
            return Err(ForecastError::Shape(format!(
                "data is {:?} but labels are {:?}",
                data.dim(),
                labels.dim()
            )));
        }
        if t == 0 {
            return Err(ForecastError::Shape("split has no timestamps".into()));
        }
        Ok(Self { data, labels })
    }

    pub fn num_timestamps(&self) -> usize {
        self.data.dim().0
    }

    pub fn num_nodes(&self) -> usize {
        self.data.dim().1
    }

    pub fn num_features(&self) -> usize {
        self.data.dim().2
    }

    pub fn horizon(&self) -> usize {
        self.labels.dim().2
    }
}

/// Train and test splits sharing one entity graph.
#[derive(Debug, Clone)]
pub struct ForecastDataset {
    pub train: Split,
    pub test: Split,
    /// Raw `[N, N]` relation matrix, normalised by the model builder.
    pub adjacency: Array2<f32>,
}

impl ForecastDataset {
    /// Check that both splits agree on `N`, `F` and `P` and that the
    /// adjacency is `N × N`.
    pub fn new(train: Split, test: Split, adjacency: Array2<f32>) -> Result<Self> {
        if train.num_nodes() != test.num_nodes()
            || train.num_features() != test.num_features()
            || train.horizon() != test.horizon()
        {
            return Err(ForecastError::Shape(format!(
                "train split is {:?} -> {:?}, test split is {:?} -> {:?}",
                train.data.dim(),
                train.labels.dim(),
                test.data.dim(),
                test.labels.dim()
            )));
        }
        let n = train.num_nodes();
        if adjacency.dim() != (n, n) {
            return Err(ForecastError::Shape(format!(
                "adjacency is {:?}, expected ({n}, {n})",
                adjacency.dim()
            )));
        }
        Ok(Self {
            train,
            test,
            adjacency,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.train.num_nodes()
    }

    pub fn num_features(&self) -> usize {
        self.train.num_features()
    }

    pub fn horizon(&self) -> usize {
        self.train.horizon()
    }

    /// Row-major copy of the adjacency.
    pub fn adjacency_vec(&self) -> Vec<f32> {
        self.adjacency.iter().copied().collect()
    }

    pub fn load_dir(dir: &Path) -> Result<Self> {
        let train = Split::new(
            read_array(&dir.join(TRAIN_DATA_FILE))?,
            read_array(&dir.join(TRAIN_LABELS_FILE))?,
        )?;
        let test = Split::new(
            read_array(&dir.join(TEST_DATA_FILE))?,
            read_array(&dir.join(TEST_LABELS_FILE))?,
        )?;
        let adjacency = read_array(&dir.join(ADJACENCY_FILE))?;
        log::info!(
            "loaded dataset from {}: train {:?}, test {:?}",
            dir.display(),
            train.data.dim(),
            test.data.dim()
        );
        Self::new(train, test, adjacency)
    }

    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| ForecastError::io(dir, e))?;
        write_array(&dir.join(TRAIN_DATA_FILE), &self.train.data)?;
        write_array(&dir.join(TRAIN_LABELS_FILE), &self.train.labels)?;
        write_array(&dir.join(TEST_DATA_FILE), &self.test.data)?;
        write_array(&dir.join(TEST_LABELS_FILE), &self.test.labels)?;
        write_array(&dir.join(ADJACENCY_FILE), &self.adjacency)
    }
}

fn read_array<A: ReadNpyExt>(path: &Path) -> Result<A> {
    let file = File::open(path).map_err(|e| ForecastError::io(path, e))?;
    A::read_npy(BufReader::new(file)).map_err(|e| ForecastError::parse(path, e))
}

fn write_array<A: WriteNpyExt>(path: &Path, array: &A) -> Result<()> {
    let file = File::create(path).map_err(|e| ForecastError::io(path, e))?;
    array
        .write_npy(BufWriter::new(file))
        .map_err(|e| ForecastError::parse(path, e))
}

/// A split uploaded to a device, one `[N, F]` / `[N, P]` pair per timestamp.
#[derive(Debug, Clone)]
pub struct DeviceSplit<B: Backend> {
    pub data: Tensor<B, 3>,
    pub labels: Tensor<B, 3>,
}

impl<B: Backend> DeviceSplit<B> {
    pub fn upload(split: &Split, device: &B::Device) -> Self {
        Self {
            data: array_to_tensor(&split.data, device),
            labels: array_to_tensor(&split.labels, device),
        }
    }

    pub fn num_timestamps(&self) -> usize {
        self.data.dims()[0]
    }

    /// Features and labels of one timestamp as `[N, F]` and `[N, P]`.
    pub fn timestamp(&self, index: usize) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [_, n, f] = self.data.dims();
        let [_, _, p] = self.labels.dims();
        let data = self
            .data
            .clone()
            .slice([index..index + 1, 0..n, 0..f])
            .reshape([n, f]);
        let labels = self
            .labels
            .clone()
            .slice([index..index + 1, 0..n, 0..p])
            .reshape([n, p]);
        (data, labels)
    }
}

fn array_to_tensor<B: Backend>(array: &Array3<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (a, b, c) = array.dim();
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [a, b, c]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use ndarray::Array;

    fn split(t: usize, n: usize, f: usize, p: usize) -> Split {
        Split::new(Array3::zeros((t, n, f)), Array3::zeros((t, n, p))).unwrap()
    }

    #[test]
    fn test_split_rejects_mismatched_timestamps() {
        let err = Split::new(Array3::zeros((3, 2, 1)), Array3::zeros((4, 2, 1))).unwrap_err();
        assert!(matches!(err, ForecastError::Shape(_)));
    }

    #[test]
    fn test_split_rejects_empty() {
        let err = Split::new(Array3::zeros((0, 2, 1)), Array3::zeros((0, 2, 1))).unwrap_err();
        assert!(matches!(err, ForecastError::Shape(_)));
    }

    #[test]
    fn test_dataset_checks_adjacency() {
        let err = ForecastDataset::new(split(4, 3, 2, 1), split(2, 3, 2, 1), Array2::zeros((3, 2)))
            .unwrap_err();
        assert!(matches!(err, ForecastError::Shape(_)));
    }

    #[test]
    fn test_dataset_checks_split_agreement() {
        let err = ForecastDataset::new(split(4, 3, 2, 1), split(2, 3, 5, 1), Array2::zeros((3, 3)))
            .unwrap_err();
        assert!(matches!(err, ForecastError::Shape(_)));

        let ok = ForecastDataset::new(split(4, 3, 2, 1), split(2, 3, 2, 1), Array2::zeros((3, 3)))
            .unwrap();
        assert_eq!(ok.num_nodes(), 3);
        assert_eq!(ok.num_features(), 2);
        assert_eq!(ok.horizon(), 1);
    }

    #[test]
    fn test_timestamp_slicing() {
        let data = Array::from_shape_fn((2, 3, 2), |(t, n, f)| (t * 100 + n * 10 + f) as f32);
        let labels = Array::from_shape_fn((2, 3, 1), |(t, n, _)| (t * 100 + n) as f32);
        let split = Split::new(data, labels).unwrap();

        let device = Default::default();
        let uploaded = DeviceSplit::<NdArray<f32>>::upload(&split, &device);
        assert_eq!(uploaded.num_timestamps(), 2);

        let (x, y) = uploaded.timestamp(1);
        assert_eq!(x.dims(), [3, 2]);
        assert_eq!(
            x.into_data().to_vec::<f32>().unwrap(),
            vec![100.0, 101.0, 110.0, 111.0, 120.0, 121.0]
        );
        assert_eq!(y.into_data().to_vec::<f32>().unwrap(), vec![100.0, 101.0, 102.0]);
    }
}
