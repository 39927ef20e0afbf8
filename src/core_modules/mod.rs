pub mod color_clusterer;
pub mod color_group;
pub mod material;
pub mod pixel;
pub mod selection;
pub mod simulator;
pub mod smart_pixel;
pub mod texture;
pub mod tolerance;
pub mod transformer;
pub mod utils;
