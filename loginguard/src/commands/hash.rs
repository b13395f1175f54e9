use anyhow::Result;
use loginguard_common::helpers::hash::hash_password;

use super::common::read_password;

pub(crate) async fn command() -> Result<()> {
    let password = read_password("Password to be hashed")?;
    let hash = hash_password(password.expose_secret())?;
    println!("{}", hash);
    Ok(())
}
