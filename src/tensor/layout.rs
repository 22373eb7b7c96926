//! Layout descriptor for detector output tensors.
//!
//! Detector heads emit either `[1, attrs, anchors]` (attributes first, the
//! common export layout) or `[1, anchors, attrs]`. The layout is resolved once
//! when the pipeline is built and reduced to a pair of strides, so reads in the
//! decode loop never branch on it.

use crate::util::{DetectError, DetectResult};

/// Number of box attributes preceding the class scores (`xc, yc, w, h`).
pub const BOX_ATTRS: usize = 4;

/// Which non-batch axis carries the per-anchor attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorLayout {
    /// `[1, attrs, anchors]`.
    AttrsFirst,
    /// `[1, anchors, attrs]`.
    AnchorsFirst,
}

/// Resolved tensor geometry: attribute/anchor counts and element strides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TensorLayout {
    layout: AnchorLayout,
    num_classes: usize,
    num_anchors: usize,
    attr_stride: usize,
    anchor_stride: usize,
}

impl TensorLayout {
    /// Resolves the layout of an output tensor with `shape` for a model with
    /// `num_classes` classes.
    ///
    /// When both axes have the expected attribute count the tensor is treated
    /// as attributes-first.
    pub fn resolve(shape: &[usize], num_classes: usize) -> DetectResult<Self> {
        if shape.len() != 3 {
            return Err(DetectError::InvalidTensorRank { rank: shape.len() });
        }
        if shape[0] != 1 {
            return Err(DetectError::InvalidBatch { batch: shape[0] });
        }
        let (a, b) = (shape[1], shape[2]);
        let expected = BOX_ATTRS + num_classes;

        if a == expected && b > 0 {
            return Ok(Self::attrs_first(num_classes, b));
        }
        if b == expected && a > 0 {
            return Ok(Self::anchors_first(num_classes, a));
        }

        // The smaller axis is the attribute axis in every real export; if it
        // can hold class scores, the vocabulary is the mismatched side.
        let attrs = a.min(b);
        if attrs > BOX_ATTRS {
            return Err(DetectError::ClassCountMismatch {
                labels: num_classes,
                model_classes: attrs - BOX_ATTRS,
            });
        }
        Err(DetectError::AttributeAxisNotFound {
            dims: [a, b],
            expected,
        })
    }

    fn attrs_first(num_classes: usize, num_anchors: usize) -> Self {
        Self {
            layout: AnchorLayout::AttrsFirst,
            num_classes,
            num_anchors,
            attr_stride: num_anchors,
            anchor_stride: 1,
        }
    }

    fn anchors_first(num_classes: usize, num_anchors: usize) -> Self {
        Self {
            layout: AnchorLayout::AnchorsFirst,
            num_classes,
            num_anchors,
            attr_stride: 1,
            anchor_stride: BOX_ATTRS + num_classes,
        }
    }

    /// Returns which axis carries the attributes.
    pub fn layout(&self) -> AnchorLayout {
        self.layout
    }

    /// Returns the number of class scores per anchor.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Returns the number of anchors.
    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    /// Returns the number of attributes per anchor (`4 + classes`).
    pub fn num_attrs(&self) -> usize {
        BOX_ATTRS + self.num_classes
    }

    /// Returns the number of elements the output buffer must hold.
    pub fn len(&self) -> usize {
        self.num_attrs() * self.num_anchors
    }

    /// Returns true when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn offset(&self, attr: usize, anchor: usize) -> usize {
        attr * self.attr_stride + anchor * self.anchor_stride
    }
}
