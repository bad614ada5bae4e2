use neat_fs::{NeatFileSystem, BLOCK_DATA_SIZE, ROOT_INODE};
use vfs::Error;

fn volume() -> NeatFileSystem {
    NeatFileSystem::in_memory(256).unwrap()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[test]
fn write_read_round_trip() {
    let mut efs = volume();
    efs.mknod("/f", 0o644).unwrap();

    for (offset, len) in [
        (0, 17),
        (100, BLOCK_DATA_SIZE),
        (BLOCK_DATA_SIZE - 1, 2),
        (3 * BLOCK_DATA_SIZE + 5, 2 * BLOCK_DATA_SIZE + 9),
    ] {
        let data = pattern(len);
        assert_eq!(efs.write_at("/f", offset, &data).unwrap(), len);
        assert_eq!(efs.read_at("/f", offset, len).unwrap(), data);
    }
}

#[test]
fn multi_block_file() {
    let mut efs = volume();
    let data = pattern(3 * BLOCK_DATA_SIZE + 10);
    let before = efs.usage().used_blocks;

    efs.mknod("/big", 0o644).unwrap();
    efs.write_at("/big", 0, &data).unwrap();

    assert_eq!(efs.usage().used_blocks - before, 4);
    assert_eq!(efs.stat("/big").unwrap().blocks, 4);
    assert_eq!(efs.read_at("/big", 0, data.len()).unwrap(), data);
}

#[test]
fn create_and_unlink() {
    let mut efs = volume();
    efs.mknod("/keep", 0o644).unwrap();
    let inode_id = efs.mknod("/a", 0o644).unwrap();
    assert_eq!(efs.resolve_path("/a"), Ok(inode_id));
    let entries = efs.read_dir(ROOT_INODE).unwrap().len();

    efs.unlink("/a").unwrap();
    assert_eq!(efs.resolve_path("/a"), Err(Error::NotFound));
    assert_eq!(efs.read_dir(ROOT_INODE).unwrap().len(), entries - 1);
    assert!(efs.resolve_path("/keep").is_ok());
}

#[test]
fn hard_links_alias() {
    let mut efs = volume();
    efs.mknod("/a", 0o644).unwrap();
    efs.link("/a", "/b").unwrap();
    assert_eq!(efs.resolve_path("/a"), efs.resolve_path("/b"));

    efs.write_at("/a", 0, b"shared").unwrap();
    assert_eq!(efs.read_at("/b", 0, 6).unwrap(), b"shared");

    // the other name keeps the object alive
    efs.unlink("/a").unwrap();
    assert_eq!(efs.read_at("/b", 0, 6).unwrap(), b"shared");
}

#[test]
fn rename_moves_the_name() {
    let mut efs = volume();
    let inode_id = efs.mknod("/a", 0o644).unwrap();
    efs.mkdir("/dir", 0o755).unwrap();

    efs.rename("/a", "/b").unwrap();
    assert_eq!(efs.resolve_path("/b"), Ok(inode_id));
    assert_eq!(efs.resolve_path("/a"), Err(Error::NotFound));

    efs.rename("/b", "/dir/c").unwrap();
    assert_eq!(efs.resolve_path("/dir/c"), Ok(inode_id));
    assert_eq!(efs.resolve_path("/b"), Err(Error::NotFound));
}

#[test]
fn inode_table_fills_up() {
    let mut efs = volume();
    efs.mkdir("/d", 0o755).unwrap();

    // root and /d take two of the 102 slots
    for i in 0..100 {
        efs.mknod(&format!("/d/{i}"), 0o644).unwrap();
    }
    assert_eq!(efs.usage().used_inodes, 102);
    assert_eq!(efs.mknod("/d/extra", 0o644), Err(Error::Exhausted));

    // unlinked inodes stay taken
    efs.unlink("/d/0").unwrap();
    assert_eq!(efs.mknod("/d/extra", 0o644), Err(Error::Exhausted));
    assert_eq!(efs.ls("/d").unwrap().len(), 99);
}
