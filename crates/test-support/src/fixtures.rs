/// テストで使うテナント名
pub const TEST_TENANT: &str = "haqu-test";

/// 指定サイズのダミー PNG データ（先頭だけ PNG シグネチャ）
pub fn image_bytes(size: usize) -> Vec<u8> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut bytes = vec![0u8; size];
    let head = size.min(SIGNATURE.len());
    bytes[..head].copy_from_slice(&SIGNATURE[..head]);
    bytes
}
