pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;
pub mod dataset;

pub use epoch_stats::EpochStats;
pub use train_config::TrainConfig;
pub use loop_fn::train_loop;
pub use dataset::{load_image_folder, ImageFolder};
