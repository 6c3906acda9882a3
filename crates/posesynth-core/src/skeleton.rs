//! Static joint hierarchy with left/right symmetry sets.
//!
//! A [`Skeleton`] only answers structural queries. It is built once, checked
//! for a valid parent ordering, and shared read-only for the rest of a run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::joints::NUM_JOINTS;

/// Errors raised by skeleton construction and lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    /// A joint index outside `0..num_joints`.
    #[error("joint index {index} out of range for skeleton with {len} joints")]
    JointOutOfRange { index: usize, len: usize },
    /// The hierarchy has no root or more than one root.
    #[error("skeleton must have exactly one root, found {0}")]
    RootCount(usize),
    /// A parent that does not precede its child in index order.
    #[error("joint {joint} has parent {parent}, parents must precede children")]
    ParentOrder { joint: usize, parent: i32 },
    /// A joint listed as both left and right.
    #[error("joint {0} is listed as both left and right")]
    AmbiguousSide(usize),
}

/// Joint hierarchy as a parent array (`-1` marks the root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SkeletonDef", into = "SkeletonDef")]
pub struct Skeleton {
    parents: Vec<i32>,
    joints_left: Vec<usize>,
    joints_right: Vec<usize>,
}

/// Serialized form of a [`Skeleton`]; validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonDef {
    pub parents: Vec<i32>,
    pub joints_left: Vec<usize>,
    pub joints_right: Vec<usize>,
}

impl TryFrom<SkeletonDef> for Skeleton {
    type Error = SkeletonError;

    fn try_from(def: SkeletonDef) -> Result<Self, Self::Error> {
        Skeleton::new(def.parents, def.joints_left, def.joints_right)
    }
}

impl From<Skeleton> for SkeletonDef {
    fn from(s: Skeleton) -> Self {
        Self {
            parents: s.parents,
            joints_left: s.joints_left,
            joints_right: s.joints_right,
        }
    }
}

impl Skeleton {
    /// Build a skeleton, checking that it is single-rooted and that every
    /// parent index is strictly smaller than its child's.
    ///
    /// The ordering rule makes the index order a valid topological order, so
    /// the graph cannot contain cycles.
    pub fn new(
        parents: Vec<i32>,
        joints_left: Vec<usize>,
        joints_right: Vec<usize>,
    ) -> Result<Self, SkeletonError> {
        let len = parents.len();
        let roots = parents.iter().filter(|&&p| p < 0).count();
        if roots != 1 {
            return Err(SkeletonError::RootCount(roots));
        }
        for (joint, &parent) in parents.iter().enumerate() {
            if parent < -1 || (parent >= 0 && parent as usize >= joint) {
                return Err(SkeletonError::ParentOrder { joint, parent });
            }
        }
        for &j in joints_left.iter().chain(joints_right.iter()) {
            if j >= len {
                return Err(SkeletonError::JointOutOfRange { index: j, len });
            }
        }
        if let Some(&j) = joints_left.iter().find(|j| joints_right.contains(j)) {
            return Err(SkeletonError::AmbiguousSide(j));
        }

        Ok(Self {
            parents,
            joints_left,
            joints_right,
        })
    }

    /// The canonical 17-joint H3.6M-style hierarchy.
    ///
    /// ```text
    /// 0 Hip ─┬─ 1 RHip ─ 2 RKnee ─ 3 RFoot
    ///        ├─ 4 LHip ─ 5 LKnee ─ 6 LFoot
    ///        └─ 7 Spine ─ 8 Thorax ─┬─ 9 Neck ─ 10 Head
    ///                               ├─ 11 LShoulder ─ 12 LElbow ─ 13 LWrist
    ///                               └─ 14 RShoulder ─ 15 RElbow ─ 16 RWrist
    /// ```
    pub fn h36m() -> Self {
        Self {
            parents: vec![-1, 0, 1, 2, 0, 4, 5, 0, 7, 8, 9, 8, 11, 12, 8, 14, 15],
            joints_left: vec![4, 5, 6, 11, 12, 13],
            joints_right: vec![1, 2, 3, 14, 15, 16],
        }
    }

    /// Number of joints in the hierarchy.
    pub fn num_joints(&self) -> usize {
        self.parents.len()
    }

    /// Parent array, `-1` for the root.
    pub fn parents(&self) -> &[i32] {
        &self.parents
    }

    /// Left-side joints, paired positionally with [`Skeleton::joints_right`].
    pub fn joints_left(&self) -> &[usize] {
        &self.joints_left
    }

    /// Right-side joints, paired positionally with [`Skeleton::joints_left`].
    pub fn joints_right(&self) -> &[usize] {
        &self.joints_right
    }

    /// Parent of `joint`, or `None` for the root.
    pub fn parent_of(&self, joint: usize) -> Result<Option<usize>, SkeletonError> {
        let parent = *self.parents.get(joint).ok_or(SkeletonError::JointOutOfRange {
            index: joint,
            len: self.parents.len(),
        })?;
        Ok((parent >= 0).then_some(parent as usize))
    }

    /// Whether `joint` is on the left side.
    pub fn is_left(&self, joint: usize) -> Result<bool, SkeletonError> {
        self.check_index(joint)?;
        Ok(self.joints_left.contains(&joint))
    }

    /// Whether `joint` is on the right side.
    pub fn is_right(&self, joint: usize) -> Result<bool, SkeletonError> {
        self.check_index(joint)?;
        Ok(self.joints_right.contains(&joint))
    }

    /// Direct children of `joint`, in index order.
    pub fn children(&self, joint: usize) -> Result<Vec<usize>, SkeletonError> {
        self.check_index(joint)?;
        Ok(self
            .parents
            .iter()
            .enumerate()
            .filter(|(_, &p)| p == joint as i32)
            .map(|(j, _)| j)
            .collect())
    }

    /// Mirror index of `joint`: the paired joint on the opposite side, or the
    /// joint itself when it lies on the centre line.
    ///
    /// Left and right lists are paired positionally.
    pub fn mirror_of(&self, joint: usize) -> Result<usize, SkeletonError> {
        self.check_index(joint)?;
        if let Some(pos) = self.joints_left.iter().position(|&j| j == joint) {
            return Ok(self.joints_right.get(pos).copied().unwrap_or(joint));
        }
        if let Some(pos) = self.joints_right.iter().position(|&j| j == joint) {
            return Ok(self.joints_left.get(pos).copied().unwrap_or(joint));
        }
        Ok(joint)
    }

    /// `[[left...], [right...]]`, the layout stored in dataset metadata.
    pub fn keypoints_symmetry(&self) -> [Vec<usize>; 2] {
        [self.joints_left.clone(), self.joints_right.clone()]
    }

    /// Returns true when this skeleton has the canonical joint count.
    pub fn is_canonical_size(&self) -> bool {
        self.parents.len() == NUM_JOINTS
    }

    fn check_index(&self, joint: usize) -> Result<(), SkeletonError> {
        if joint >= self.parents.len() {
            return Err(SkeletonError::JointOutOfRange {
                index: joint,
                len: self.parents.len(),
            });
        }
        Ok(())
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::h36m()
    }
}
