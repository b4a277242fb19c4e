use std::sync::OnceLock;

use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};
use tracing::{debug, info};

/// libtorch CUDA components, core first. `libtorch_cuda.so` is the only one
/// shipped by libtorch 2.x; the split pair covers older 1.x builds.
const CUDA_LIBRARIES: [&str; 4] = [
    "libc10_cuda.so",
    "libtorch_cuda.so",
    "libtorch_cuda_cu.so",
    "libtorch_cuda_cpp.so",
];

/// Preload libtorch's CUDA libraries into the global symbol namespace so
/// `Cuda::is_available` sees the GPU even when the binary was linked without
/// them. Runs once; returns how many libraries are resident. Handles are
/// leaked for the lifetime of the process.
pub(crate) fn preload_cuda_runtime() -> usize {
    static LOADED: OnceLock<usize> = OnceLock::new();
    *LOADED.get_or_init(|| {
        let mut handles = Vec::new();
        let mut missing = Vec::new();
        for lib in CUDA_LIBRARIES {
            match unsafe { Library::open(Some(lib), RTLD_NOW | RTLD_GLOBAL) } {
                Ok(handle) => {
                    debug!("preloaded {lib}");
                    handles.push(handle);
                }
                Err(err) => missing.push(format!("{lib} ({err})")),
            }
        }
        let loaded = handles.len();
        if loaded == 0 {
            info!(
                "no libtorch CUDA library could be preloaded: {}",
                missing.join(", ")
            );
        } else if !missing.is_empty() {
            debug!("optional CUDA libraries not present: {}", missing.join(", "));
        }
        Box::leak(Box::new(handles));
        loaded
    })
}
