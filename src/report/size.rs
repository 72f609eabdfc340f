/// Human readable byte count: `512 B`, `1.50 KB`, `2.00 MB`.
///
/// Exactly 1 MiB is still shown in KB.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes <= MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}
