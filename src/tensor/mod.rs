//! Typed read access over a detector's raw output buffer.
//!
//! `TensorData` is the closed set of element encodings the pipeline accepts.
//! It is dispatched once per frame into a monomorphized `TensorView<T>`, whose
//! reads are a strided index plus an inlined dequantization.

mod layout;

pub use layout::{AnchorLayout, TensorLayout, BOX_ATTRS};

use crate::util::math::is_positive;
use crate::util::{DetectError, DetectResult};

/// Affine quantization parameters: `value = (raw - zero_point) * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantization {
    /// Scale applied after removing the zero point.
    pub scale: f32,
    /// Raw value that maps to zero.
    pub zero_point: i32,
}

impl Quantization {
    /// Creates quantization parameters.
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    fn validate(&self) -> DetectResult<()> {
        if !is_positive(self.scale) {
            return Err(DetectError::InvalidQuantization { scale: self.scale });
        }
        Ok(())
    }
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            scale: 1.0,
            zero_point: 0,
        }
    }
}

/// Element types that can be read as `f32` scores.
pub trait TensorElement: Copy + Send + Sync {
    /// Converts a raw element to its real value.
    fn dequantize(self, quant: Quantization) -> f32;
}

impl TensorElement for f32 {
    #[inline(always)]
    fn dequantize(self, _quant: Quantization) -> f32 {
        self
    }
}

impl TensorElement for u8 {
    #[inline(always)]
    fn dequantize(self, quant: Quantization) -> f32 {
        (i32::from(self) - quant.zero_point) as f32 * quant.scale
    }
}

impl TensorElement for i8 {
    #[inline(always)]
    fn dequantize(self, quant: Quantization) -> f32 {
        (i32::from(self) - quant.zero_point) as f32 * quant.scale
    }
}

/// Raw output buffer of one forward pass.
#[derive(Clone, Copy, Debug)]
pub enum TensorData<'a> {
    /// Floating-point output.
    F32(&'a [f32]),
    /// Affine-quantized unsigned 8-bit output.
    U8 {
        data: &'a [u8],
        quant: Quantization,
    },
    /// Affine-quantized signed 8-bit output.
    I8 {
        data: &'a [i8],
        quant: Quantization,
    },
}

impl<'a> TensorData<'a> {
    /// Returns the number of elements in the buffer.
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(data) => data.len(),
            TensorData::U8 { data, .. } => data.len(),
            TensorData::I8 { data, .. } => data.len(),
        }
    }

    /// Returns true when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strided, dequantizing view over one output buffer.
#[derive(Clone, Copy, Debug)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    layout: TensorLayout,
    quant: Quantization,
}

impl<'a, T: TensorElement> TensorView<'a, T> {
    /// Creates a view, checking that the buffer matches the layout exactly.
    pub fn new(data: &'a [T], layout: TensorLayout, quant: Quantization) -> DetectResult<Self> {
        let needed = layout.len();
        if data.len() != needed {
            return Err(DetectError::BufferSizeMismatch {
                needed,
                got: data.len(),
            });
        }
        quant.validate()?;
        Ok(Self {
            data,
            layout,
            quant,
        })
    }

    /// Returns the resolved layout.
    pub fn layout(&self) -> &TensorLayout {
        &self.layout
    }

    /// Returns the number of anchors.
    pub fn num_anchors(&self) -> usize {
        self.layout.num_anchors()
    }

    /// Returns the number of classes.
    pub fn num_classes(&self) -> usize {
        self.layout.num_classes()
    }

    /// Reads attribute `attr` (box attributes first, then class scores).
    ///
    /// Panics when out of range, like slice indexing.
    #[inline(always)]
    pub fn value_at(&self, attr: usize, anchor: usize) -> f32 {
        self.data[self.layout.offset(attr, anchor)].dequantize(self.quant)
    }

    /// Reads the score of `class` at `anchor`.
    #[inline(always)]
    pub fn score_at(&self, class: usize, anchor: usize) -> f32 {
        self.value_at(BOX_ATTRS + class, anchor)
    }

    /// Reads box attribute `attr` (`0..4` = `xc, yc, w, h`) at `anchor`.
    #[inline(always)]
    pub fn box_attr_at(&self, attr: usize, anchor: usize) -> f32 {
        debug_assert!(attr < BOX_ATTRS);
        self.value_at(attr, anchor)
    }

    /// Reads all four box attributes at `anchor`.
    #[inline]
    pub fn raw_box(&self, anchor: usize) -> [f32; 4] {
        [
            self.box_attr_at(0, anchor),
            self.box_attr_at(1, anchor),
            self.box_attr_at(2, anchor),
            self.box_attr_at(3, anchor),
        ]
    }
}
