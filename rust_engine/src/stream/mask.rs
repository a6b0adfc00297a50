//! 顶点属性掩码

use std::ops::{BitOr, BitOrAssign};

/// 需要构建的顶点属性集合
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttributeMask(u32);

impl AttributeMask {
    pub const NONE: Self = Self(0);
    pub const POSITIONS: Self = Self(0x01);
    pub const NORMALS: Self = Self(0x02);
    pub const TANGENTS: Self = Self(0x04);
    pub const COLORS: Self = Self(0x08);
    pub const UVS: Self = Self(0x10);
    pub const VELOCITIES: Self = Self(0x20);

    /// 需要蒙皮的三元组
    pub const SKINNED: Self = Self(0x01 | 0x02 | 0x04);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// 是否有任何需要蒙皮的属性
    pub fn skins(self) -> bool {
        self.intersects(Self::SKINNED)
    }
}

impl BitOr for AttributeMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AttributeMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
