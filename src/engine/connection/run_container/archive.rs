//! Tar archive construction for secret upload.

use std::io;

use tar::{Builder, EntryType, Header};

use crate::container::MountedSecret;

/// Build one archive holding every mounted secret, with paths relative to `/`.
///
/// Missing parent directories are created by the engine on extraction, so
/// only file entries are written and existing directories keep their modes.
pub(super) fn build_secret_archive(secrets: &[MountedSecret]) -> io::Result<Vec<u8>> {
    let mut builder = Builder::new(vec![]);

    for mounted in secrets {
        let contents = mounted.secret().expose_secret();
        let options = mounted.options();

        let mut header = root_owned_header();
        header.set_entry_type(EntryType::Regular);
        header.set_size(u64::try_from(contents.len()).map_err(io::Error::other)?);
        header.set_mode(options.mode & 0o7777);
        if let Some(owner) = options.owner.as_deref() {
            apply_owner(&mut header, owner)?;
        }
        header.set_cksum();

        builder.append_data(&mut header, archive_path(mounted.path()), contents)?;
    }

    builder.finish()?;
    builder.into_inner()
}

/// A GNU header with every numeric field written; `tar` rejects blank ones.
fn root_owned_header() -> Header {
    let mut header = Header::new_gnu();
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
}

fn archive_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Apply `user[:group]`; numeric parts set ids, anything else sets names.
fn apply_owner(header: &mut Header, owner: &str) -> io::Result<()> {
    let (user, group) = owner
        .split_once(':')
        .map_or((owner, None), |(user_part, group_part)| {
            (user_part, Some(group_part))
        });

    if let Ok(uid) = user.parse::<u64>() {
        header.set_uid(uid);
    } else if !user.is_empty() {
        header.set_username(user)?;
    }

    if let Some(group_text) = group {
        if let Ok(gid) = group_text.parse::<u64>() {
            header.set_gid(gid);
        } else if !group_text.is_empty() {
            header.set_groupname(group_text)?;
        }
    }

    Ok(())
}
