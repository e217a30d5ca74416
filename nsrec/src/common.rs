pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use bbox::{closure_of, Rect, RectFloat as _, RectNum as _, HW, LTWH, TLBR};
pub use futures::stream::{self, Stream};
pub use image::{imageops::FilterType, DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use label::{DigitBox, DigitClass, EncodedLabel, Label, LabelEncoder, NUM_DIGIT_CLASSES};
pub use ndarray::{Array1, Array2, Array3, Array4, Axis};
pub use noisy_float::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    fs,
    io::BufReader,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
pub use tracing::{debug, info, info_span, trace, warn};
