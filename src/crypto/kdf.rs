use zeroize::Zeroizing;

use crate::crypto::Crypto;
use crate::errors::Result;
use crate::types::{StringToKey, StringToKeyType};
use crate::{bail, unsupported_err};

/// Derives `key_size` bytes of symmetric key material from a
/// passphrase, per the S2K specifier.
///
/// Each round preloads the hash context with one more zero byte than
/// the previous, until enough material has been produced.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.7.1>
pub fn s2k_derive(
    crypto: &dyn Crypto,
    s2k: &StringToKey,
    passphrase: &[u8],
    key_size: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_size));
    let zeros = [0u8; 64];

    let mut round = 0usize;
    while key.len() < key_size {
        let mut ctx = crypto.hasher(s2k.hash)?;

        // preload: `round` zero bytes
        let mut preload = round;
        while preload > 0 {
            let n = preload.min(zeros.len());
            ctx.update(&zeros[..n]);
            preload -= n;
        }

        match s2k.typ {
            StringToKeyType::Simple => {
                ctx.update(passphrase);
            }
            StringToKeyType::Salted => {
                let Some(salt) = s2k.salt.as_ref() else {
                    bail!("salted s2k without a salt");
                };
                ctx.update(salt);
                ctx.update(passphrase);
            }
            StringToKeyType::IteratedAndSalted => {
                let Some(salt) = s2k.salt.as_ref() else {
                    bail!("iterated s2k without a salt");
                };
                let Some(octets) = s2k.count() else {
                    bail!("iterated s2k without a count");
                };
                let chunk_len = salt.len() + passphrase.len();
                // always hash salt || passphrase at least once in full
                let total = octets.max(chunk_len);

                let mut hashed = 0usize;
                while hashed + chunk_len <= total {
                    ctx.update(salt);
                    ctx.update(passphrase);
                    hashed += chunk_len;
                }
                let mut left = total - hashed;
                if left > 0 {
                    let n = left.min(salt.len());
                    ctx.update(&salt[..n]);
                    left -= n;
                    if left > 0 {
                        ctx.update(&passphrase[..left]);
                    }
                }
            }
            StringToKeyType::Reserved => {
                unsupported_err!("reserved s2k type");
            }
        }

        let digest = ctx.finalize_reset();
        let needed = key_size - key.len();
        key.extend_from_slice(&digest[..digest.len().min(needed)]);

        round += 1;
    }

    Ok(key)
}
