//! The seam between the pipeline and whichever module produces saliency
//! maps.

use burn::prelude::*;
use u2net_burn::U2Net;

/// Black-box contract of the segmentation network: a normalized
/// `[1, 3, 320, 320]` tensor in, seven sigmoid-activated single-channel
/// maps at the same spatial size out, the fused map first.
///
/// Only index 0 is consumed by the pipeline; the six auxiliary maps exist
/// for the network's training-time supervision and are discarded. Calls
/// are synchronous, stateless, and side-effect free.
pub trait SalientObjectModel<B: Backend> {
    fn predict(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 7];
}

impl<B: Backend> SalientObjectModel<B> for U2Net<B> {
    fn predict(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 7] {
        self.forward(input)
    }
}
