mod rsu;
mod u2net;

pub use u2net::{U2Net, U2NetRecord};
