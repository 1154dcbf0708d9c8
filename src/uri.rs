use bfp_support::constants::{LEGACY_URI_SCHEME, URI_SCHEME};
use bfp_support::BfpError;
use bitcoin::Txid;
use std::fmt;
use std::str::FromStr;

/// `bitcoinfile:<txid>` reference to a file's metadata transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BfpUri {
    pub txid: Txid,
}

impl BfpUri {
    pub fn new(txid: Txid) -> Self {
        Self { txid }
    }
}

impl FromStr for BfpUri {
    type Err = BfpError;

    /// Accepts the canonical scheme, the legacy `bitcoinfiles:` alias, or a bare txid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let txid = match s.split_once(':') {
            Some((scheme, rest)) if scheme == URI_SCHEME || scheme == LEGACY_URI_SCHEME => rest,
            Some((scheme, _)) => {
                return Err(BfpError::InvalidUri(format!("unknown scheme '{scheme}'")))
            }
            None => s,
        };
        let txid = Txid::from_str(txid).map_err(|e| BfpError::InvalidUri(format!("{s}: {e}")))?;
        Ok(Self { txid })
    }
}

impl fmt::Display for BfpUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{URI_SCHEME}:{}", self.txid)
    }
}

impl From<Txid> for BfpUri {
    fn from(txid: Txid) -> Self {
        Self::new(txid)
    }
}
