use std::path::Path;

use grit::types::OpenOptions;
use grit::Local;

pub fn init_repo(dir: &Path) -> Local {
    Local::init(dir, &OpenOptions::default()).unwrap()
}
