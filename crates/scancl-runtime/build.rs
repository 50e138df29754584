use cfg_aliases::cfg_aliases;

fn main() {
    // Setup cfg aliases
    cfg_aliases! {
        std_io: { all(feature = "std", any(target_os = "windows", target_os = "linux", target_os = "macos")) },
        prefetch_x86: { target_arch = "x86_64" },
        prefetch_arm: { target_arch = "aarch64" },
    }
}
