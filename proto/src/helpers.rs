// Copyright (c) 2023 The hwcoin Developers

//! encdec helper modules for frame header fields

/// encdec helper module for fixed size arrays
pub(crate) mod arr {
    use crate::frame::FrameError;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, FrameError> {
        if buff.len() < N {
            return Err(FrameError::InvalidLength);
        }

        buff[..N].copy_from_slice(d);

        Ok(N)
    }

    pub fn enc_len<const N: usize>(_d: &[u8; N]) -> Result<usize, FrameError> {
        Ok(N)
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), FrameError> {
        if buff.len() < N {
            return Err(FrameError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// encdec helper module for big-endian u16 fields
pub(crate) mod be16 {
    use byteorder::{BigEndian, ByteOrder};

    use crate::frame::FrameError;

    pub fn enc(v: &u16, buff: &mut [u8]) -> Result<usize, FrameError> {
        if buff.len() < 2 {
            return Err(FrameError::InvalidLength);
        }

        BigEndian::write_u16(buff, *v);

        Ok(2)
    }

    pub fn enc_len(_v: &u16) -> Result<usize, FrameError> {
        Ok(2)
    }

    pub fn dec(buff: &[u8]) -> Result<(u16, usize), FrameError> {
        if buff.len() < 2 {
            return Err(FrameError::InvalidLength);
        }

        Ok((BigEndian::read_u16(buff), 2))
    }
}

/// encdec helper module for big-endian u32 fields
pub(crate) mod be32 {
    use byteorder::{BigEndian, ByteOrder};

    use crate::frame::FrameError;

    pub fn enc(v: &u32, buff: &mut [u8]) -> Result<usize, FrameError> {
        if buff.len() < 4 {
            return Err(FrameError::InvalidLength);
        }

        BigEndian::write_u32(buff, *v);

        Ok(4)
    }

    pub fn enc_len(_v: &u32) -> Result<usize, FrameError> {
        Ok(4)
    }

    pub fn dec(buff: &[u8]) -> Result<(u32, usize), FrameError> {
        if buff.len() < 4 {
            return Err(FrameError::InvalidLength);
        }

        Ok((BigEndian::read_u32(buff), 4))
    }
}
