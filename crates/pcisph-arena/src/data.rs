//! Typed storage behind a buffer slot.

use pcisph_core::ElementType;

/// The contents of one buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferData {
    /// Float buffer.
    F32(Vec<f32>),
    /// Index buffer.
    U32(Vec<u32>),
}

impl BufferData {
    /// A buffer of `len` elements, each set to `fill_f32` or `fill_u32`
    /// depending on `element`.
    pub fn filled(element: ElementType, len: usize, fill_f32: f32, fill_u32: u32) -> Self {
        match element {
            ElementType::F32 => Self::F32(vec![fill_f32; len]),
            ElementType::U32 => Self::U32(vec![fill_u32; len]),
        }
    }

    /// Element type.
    pub fn element(&self) -> ElementType {
        match self {
            Self::F32(_) => ElementType::F32,
            Self::U32(_) => ElementType::U32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    /// Whether the buffer has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes.
    pub fn bytes(&self) -> usize {
        self.len() * 4
    }

    /// Float view, if this is a float buffer.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            Self::U32(_) => None,
        }
    }

    /// Mutable float view, if this is a float buffer.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Self::F32(v) => Some(v),
            Self::U32(_) => None,
        }
    }

    /// Index view, if this is an index buffer.
    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            Self::U32(v) => Some(v),
            Self::F32(_) => None,
        }
    }

    /// Mutable index view, if this is an index buffer.
    pub fn as_u32_mut(&mut self) -> Option<&mut [u32]> {
        match self {
            Self::U32(v) => Some(v),
            Self::F32(_) => None,
        }
    }

    /// Overwrite with `other`'s contents when both have the same type and
    /// length. Returns `false` (and leaves `self` untouched) otherwise.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Self::F32(dst), Self::F32(src)) if dst.len() == src.len() => {
                dst.copy_from_slice(src);
                true
            }
            (Self::U32(dst), Self::U32(src)) if dst.len() == src.len() => {
                dst.copy_from_slice(src);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_respects_element_type() {
        let f = BufferData::filled(ElementType::F32, 3, -1.0, 7);
        assert_eq!(f.as_f32(), Some(&[-1.0, -1.0, -1.0][..]));
        assert!(f.as_u32().is_none());
        let u = BufferData::filled(ElementType::U32, 2, -1.0, 7);
        assert_eq!(u.as_u32(), Some(&[7, 7][..]));
        assert_eq!(u.bytes(), 8);
    }

    #[test]
    fn copy_from_requires_matching_shape() {
        let mut a = BufferData::F32(vec![0.0; 2]);
        assert!(a.copy_from(&BufferData::F32(vec![1.0, 2.0])));
        assert_eq!(a.as_f32(), Some(&[1.0, 2.0][..]));
        assert!(!a.copy_from(&BufferData::F32(vec![1.0])));
        assert!(!a.copy_from(&BufferData::U32(vec![1, 2])));
    }
}
