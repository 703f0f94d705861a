//! The interface between the quadtree and whatever produces the patch geometry.
//!
//! A [`LandscapeNode`](crate::node::LandscapeNode) issues one [`PatchRequest`] when it is
//! created and keeps the receiving half ([`PendingPatch`]) of a single use channel.
//! The generator gets the sending half ([`PatchReply`]) and may answer whenever it likes,
//! from any thread. If the node is destroyed in the meantime the channel is closed and the
//! reply is silently dropped, so generators never have to know about node lifetimes.

use crate::patch::{PatchError, RawPatch};
use async_channel::{Receiver, Sender, TryRecvError};

/// The region of the landscape a patch has to cover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchRequest {
    /// The number of cells along each side of the patch.
    pub resolution: u32,
    /// The x coordinate of the center of the region.
    pub x: f32,
    /// The y coordinate of the center of the region.
    pub y: f32,
    /// The edge length of the region.
    pub scale: f32,
}

impl PatchRequest {
    /// The edge length of a single cell of the patch.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.scale / self.resolution as f32
    }
}

pub type PatchResult = Result<RawPatch, PatchError>;

/// The sending half of a patch request, handed to the [`MeshGenerator`].
pub struct PatchReply(Sender<PatchResult>);

impl PatchReply {
    /// Delivers the generated patch.
    ///
    /// Returns `false` if the requesting node no longer exists.
    /// This is not an error, the result is simply discarded.
    pub fn send(self, result: PatchResult) -> bool {
        self.0.try_send(result).is_ok()
    }

    /// Whether the requesting node still waits for this reply.
    pub fn is_wanted(&self) -> bool {
        !self.0.is_closed()
    }
}

/// The receiving half of a patch request, owned by the requesting node.
pub struct PendingPatch(Receiver<PatchResult>);

impl PendingPatch {
    /// Returns the result, if the generator has answered already.
    ///
    /// A generator that dropped its reply without answering is reported as a fault,
    /// since it will never answer.
    pub fn poll(&self) -> Option<PatchResult> {
        match self.0.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(PatchError::Abandoned)),
        }
    }
}

/// Creates a connected reply and pending pair for a single request.
pub fn patch_channel() -> (PatchReply, PendingPatch) {
    let (tx, rx) = async_channel::bounded(1);

    (PatchReply(tx), PendingPatch(rx))
}

/// Produces the geometry of landscape patches.
///
/// Calls must not block; the reply may be sent from within `request` or at any later time.
pub trait MeshGenerator: Send + Sync + 'static {
    fn request(&self, request: PatchRequest, reply: PatchReply);
}

/// Samples the height of the landscape at a horizontal position.
pub trait HeightQuery: Send + Sync + 'static {
    fn height_at(&self, x: f32, y: f32) -> f32;
}

/// A landscape without any relief.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGround;

impl HeightQuery for FlatGround {
    fn height_at(&self, _x: f32, _y: f32) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_after_drop_is_discarded() {
        let (reply, pending) = patch_channel();
        drop(pending);

        assert!(!reply.is_wanted());
        assert!(!reply.send(Ok(RawPatch::default())));
    }

    #[test]
    fn pending_until_answered() {
        let (reply, pending) = patch_channel();
        assert!(pending.poll().is_none());

        assert!(reply.send(Ok(RawPatch::default())));
        assert!(matches!(pending.poll(), Some(Ok(_))));
    }

    #[test]
    fn dropped_reply_is_a_fault() {
        let (reply, pending) = patch_channel();
        drop(reply);

        assert!(matches!(pending.poll(), Some(Err(PatchError::Abandoned))));
    }
}
