mod static_dir;
mod test;

pub use static_dir::StaticDirectory;
pub use test::TestDirectory;
