//! The histogram counter
//!
//! Every distinct token gets a dense index, every occurrence is replaced by its
//! index, and the occurrences are counted with a bincount over the index array.
//! The bincount is the only step that runs on a [`HistogramDevice`]; when the
//! device is missing or fails, the same bincount runs sequentially on the host,
//! so the returned map never depends on the device.

use std::collections::HashMap;

use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::wf::{
    config::DeviceKind,
    counter::{WordCountMap, WordCounter},
    error::{CountError, DeviceError},
    tokenizer::tokenize,
};

/// Indices handed to one device block at a time
const BLOCK_SIZE: usize = 4096;

/// Something that can count occurrences of every value in `[0, bins)`
///
/// Callers guarantee every index is below `bins`.
pub trait HistogramDevice: Send + Sync {
    fn name(&self) -> &'static str;

    fn bincount(&self, indices: &[u32], bins: usize) -> Result<Vec<u64>, DeviceError>;
}

/// Plain loop on the calling thread, always available
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialDevice;

impl SequentialDevice {
    fn histogram(&self, indices: &[u32], bins: usize) -> Vec<u64> {
        let mut histogram = vec![0u64; bins];
        for &index in indices {
            histogram[index as usize] += 1;
        }
        histogram
    }
}

impl HistogramDevice for SequentialDevice {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn bincount(&self, indices: &[u32], bins: usize) -> Result<Vec<u64>, DeviceError> {
        Ok(self.histogram(indices, bins))
    }
}

/// Block-local histograms on a thread pool, summed pairwise at the end
pub struct DataParallelDevice {
    pool: ThreadPool,
}

impl DataParallelDevice {
    pub fn new(threads: usize) -> Result<Self, DeviceError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("wf-histogram-{}", i))
            .build()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }
}

impl HistogramDevice for DataParallelDevice {
    fn name(&self) -> &'static str {
        "data_parallel"
    }

    fn bincount(&self, indices: &[u32], bins: usize) -> Result<Vec<u64>, DeviceError> {
        let histogram = self.pool.install(|| {
            indices
                .par_chunks(BLOCK_SIZE)
                .fold(
                    || vec![0u64; bins],
                    |mut local, block| {
                        for &index in block {
                            local[index as usize] += 1;
                        }
                        local
                    },
                )
                .reduce(
                    || vec![0u64; bins],
                    |mut lhs, rhs| {
                        lhs.iter_mut().zip(rhs).for_each(|(l, r)| *l += r);
                        lhs
                    },
                )
        });
        Ok(histogram)
    }
}

#[cfg(feature = "cuda")]
mod cuda {
    use std::sync::Arc;

    use cudarc::driver::{CudaDevice, LaunchAsync, LaunchConfig};
    use cudarc::nvrtc::compile_ptx;

    use super::HistogramDevice;
    use crate::wf::error::DeviceError;

    const MODULE_NAME: &str = "histogram";
    const FUNC_BINCOUNT: &str = "bincount";

    const BINCOUNT_KERNEL_SRC: &str = r#"
extern "C" __global__ void bincount(const unsigned int *indices, unsigned int n, unsigned int *bins) {
    unsigned int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        atomicAdd(&bins[indices[i]], 1u);
    }
}
"#;

    /// Atomic bincount on the first CUDA device
    pub struct CudaHistogram {
        device: Arc<CudaDevice>,
    }

    impl CudaHistogram {
        pub fn open() -> Result<Self, DeviceError> {
            let device = CudaDevice::new(0).map_err(|e| DeviceError::Unavailable(e.to_string()))?;
            let ptx = compile_ptx(BINCOUNT_KERNEL_SRC)
                .map_err(|e| DeviceError::Kernel(format!("PTX compilation failed: {}", e)))?;
            device
                .load_ptx(ptx, MODULE_NAME, &[FUNC_BINCOUNT])
                .map_err(|e| DeviceError::Kernel(format!("PTX load failed: {}", e)))?;
            Ok(Self { device })
        }
    }

    impl HistogramDevice for CudaHistogram {
        fn name(&self) -> &'static str {
            "cuda"
        }

        fn bincount(&self, indices: &[u32], bins: usize) -> Result<Vec<u64>, DeviceError> {
            let n = indices.len() as u32;
            let d_indices = self
                .device
                .htod_sync_copy(indices)
                .map_err(|e| DeviceError::Kernel(format!("HtoD copy failed: {}", e)))?;
            let mut d_bins = self
                .device
                .alloc_zeros::<u32>(bins)
                .map_err(|e| DeviceError::Kernel(format!("Alloc failed: {}", e)))?;
            let func = self
                .device
                .get_func(MODULE_NAME, FUNC_BINCOUNT)
                .ok_or_else(|| DeviceError::Kernel(format!("{} not found in {}", FUNC_BINCOUNT, MODULE_NAME)))?;

            unsafe { func.launch(LaunchConfig::for_num_elems(n), (&d_indices, n, &mut d_bins)) }
                .map_err(|e| DeviceError::Kernel(format!("bincount launch failed: {}", e)))?;

            let counts = self
                .device
                .dtoh_sync_copy(&d_bins)
                .map_err(|e| DeviceError::Kernel(format!("DtoH copy failed: {}", e)))?;
            Ok(counts.into_iter().map(u64::from).collect())
        }
    }
}

/// Open the device asked for in the configuration
pub fn open_device(kind: DeviceKind, workers: usize) -> Result<Box<dyn HistogramDevice>, DeviceError> {
    match kind {
        DeviceKind::Sequential => Ok(Box::new(SequentialDevice)),
        DeviceKind::DataParallel => Ok(Box::new(DataParallelDevice::new(workers)?)),
        DeviceKind::Cuda => open_cuda(),
        DeviceKind::Auto => match open_cuda() {
            Ok(device) => Ok(device),
            Err(e) => {
                debug!("[Histogram] {}, using the data-parallel CPU device", e);
                Ok(Box::new(DataParallelDevice::new(workers)?))
            }
        },
    }
}

#[cfg(feature = "cuda")]
fn open_cuda() -> Result<Box<dyn HistogramDevice>, DeviceError> {
    Ok(Box::new(cuda::CudaHistogram::open()?))
}

#[cfg(not(feature = "cuda"))]
fn open_cuda() -> Result<Box<dyn HistogramDevice>, DeviceError> {
    Err(DeviceError::Unavailable("built without the `cuda` feature".into()))
}

/// Give every distinct token a dense index, in first-seen order
/// Returns the index -> token table and the index of every occurrence
pub fn index_tokens(tokens: &[String]) -> (Vec<&str>, Vec<u32>) {
    let mut vocab: Vec<&str> = Vec::new();
    let mut lookup: HashMap<&str, u32> = HashMap::new();
    let indices: Vec<u32> = tokens
        .iter()
        .map(|token| {
            *lookup.entry(token.as_str()).or_insert_with(|| {
                vocab.push(token.as_str());
                (vocab.len() - 1) as u32
            })
        })
        .collect();
    (vocab, indices)
}

pub struct HistogramCounter {
    /// `None` when no device could be opened, everything then runs on the fallback
    device: Option<Box<dyn HistogramDevice>>,
    fallback: SequentialDevice,
}

impl HistogramCounter {
    pub fn new(device: Option<Box<dyn HistogramDevice>>) -> Self {
        Self { device, fallback: SequentialDevice }
    }

    /// Open the configured device, a device that can't be opened is not an error
    pub fn with_device(kind: DeviceKind, workers: usize) -> Self {
        match open_device(kind, workers) {
            Ok(device) => {
                info!("[Histogram] Using the `{}` device", device.name());
                Self::new(Some(device))
            }
            Err(e) => {
                warn!("[Histogram] {}, counting sequentially on the host", e);
                Self::new(None)
            }
        }
    }

    pub fn device_name(&self) -> &'static str {
        self.device.as_ref().map_or(self.fallback.name(), |d| d.name())
    }

    /// Count pre-tokenized words
    pub fn count_tokens(&self, tokens: &[String]) -> WordCountMap {
        if tokens.is_empty() {
            return WordCountMap::new();
        }

        let (vocab, indices) = index_tokens(tokens);
        let counts = self.histogram(&indices, vocab.len());

        vocab
            .into_iter()
            .zip(counts)
            .map(|(word, count)| (word.to_owned(), count))
            .collect()
    }

    fn histogram(&self, indices: &[u32], bins: usize) -> Vec<u64> {
        if let Some(device) = &self.device {
            let result = device.bincount(indices, bins).and_then(|histogram| {
                if histogram.len() == bins {
                    Ok(histogram)
                } else {
                    Err(DeviceError::BinMismatch { expected: bins, got: histogram.len() })
                }
            });
            match result {
                Ok(histogram) => return histogram,
                Err(e) => warn!(
                    "[Histogram] Device `{}` failed, recounting on the host: {}",
                    device.name(),
                    e
                ),
            }
        }
        self.fallback.histogram(indices, bins)
    }
}

impl WordCounter for HistogramCounter {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn count(&self, text: &str) -> Result<WordCountMap, CountError> {
        Ok(self.count_tokens(&tokenize(text)))
    }
}
