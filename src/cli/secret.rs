use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::config::Config;
use crate::secrets::encrypt_secret;
use crate::store::Store;

use super::init_store;

pub fn run_secret_encrypt(
    config: &Config,
    full_name: String,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let repo = store.get_repo_name(&full_name)?;

    let payload = match file {
        Some(path) => fs::read(&path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let sealed = encrypt_secret(&store, &repo, &payload)?;
    println!("{sealed}");

    Ok(())
}
