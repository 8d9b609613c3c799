mod common;
use common::{START_MS, TestEnv};
use std::collections::HashSet;

#[test]
fn test_write_sweeps_expired_files() {
  let env = TestEnv::with_default();
  let ancient = env.seed_file(START_MS - 20_000, 10);
  let at_threshold = env.seed_file(START_MS - 10_000, 10);
  let young = env.seed_file(START_MS - 9_000, 10);

  // Listing alone has no side effects.
  assert_eq!(env.orch.get_all_files(), vec![ancient.clone(), at_threshold.clone(), young.clone()]);

  let target = env.orch.get_writable_file(10).unwrap();

  assert!(!ancient.exists());
  assert!(!at_threshold.exists());
  assert!(young.exists());
  assert_eq!(env.orch.get_all_files(), vec![young]);
  assert_ne!(target, at_threshold);
}

#[test]
fn test_read_sweeps_expired_files() {
  let env = TestEnv::with_default();
  let expired = env.seed_file(START_MS - 15_000, 10);
  let readable = env.seed_file(START_MS - 5_000, 10);

  assert_eq!(env.orch.get_readable_file(&HashSet::new()), Some(readable));
  assert!(!expired.exists());
}

#[test]
fn test_unread_files_expire() {
  let env = TestEnv::with_default();
  let file = env.write(100);

  env.clock.advance(9_999);
  assert_eq!(env.orch.get_readable_file(&HashSet::new()), Some(file.clone()));

  // Never consumed: dropped once it reaches the threshold.
  env.clock.advance(1);
  assert!(env.orch.get_readable_file(&HashSet::new()).is_none());
  assert!(!file.exists());
  assert!(env.orch.get_flushable_files().is_empty());
}

#[test]
fn test_unparseable_batch_name_is_swept() {
  let env = TestEnv::with_default();
  std::fs::create_dir_all(&env.root).unwrap();
  let overflow = env.root.join("99999999999999999999999999");
  std::fs::write(&overflow, b"x").unwrap();

  env.orch.get_writable_file(10).unwrap();
  assert!(!overflow.exists());
}

#[test]
fn test_failed_retention_delete_is_not_fatal() {
  let env = TestEnv::with_default();
  let stuck = env.seed_file(START_MS - 20_000, 10);
  let expired = env.seed_file(START_MS - 15_000, 10);
  env.storage.fail_deletes_of(&stuck);

  assert!(env.orch.get_writable_file(10).is_some());
  assert!(stuck.exists());
  assert!(!expired.exists());

  env.storage.heal();
  env.orch.get_writable_file(10).unwrap();
  assert!(!stuck.exists());
}
