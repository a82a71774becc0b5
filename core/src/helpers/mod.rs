// Copyright (c) 2023 The hwcoin Developers

use core::str::from_utf8;

use emstr::{helpers::Fractional, EncodeStr};

use crate::coins::CoinInfo;

/// Maximum significant characters before an amount is truncated
const MAX_AMOUNT_CHARS: usize = 18;

/// Format an amount in base units for display using the coin scalar
pub fn fmt_amount<'a>(value: u64, coin: &CoinInfo, buff: &'a mut [u8]) -> &'a str {
    let value = i64::try_from(value).unwrap_or(i64::MAX);

    let mut n = match emstr::write!(&mut buff[..], Fractional::<i64>::new(value, coin.scalar())) {
        Ok(v) => v,
        Err(_) => return "ENCODE_ERR",
    };

    // Truncate over-long values with a marker
    if n > MAX_AMOUNT_CHARS && buff.len() >= MAX_AMOUNT_CHARS + 2 {
        n = MAX_AMOUNT_CHARS;
        buff[n] = b'.';
        buff[n + 1] = b'.';
        n += 2;
    }

    match from_utf8(&buff[..n]) {
        Ok(v) => v,
        Err(_) => "INVALID_UTF8",
    }
}
