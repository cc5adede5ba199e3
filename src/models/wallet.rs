use chrono::NaiveDateTime;
use validator::{Validate, ValidationErrors};

use models::*;
use schema::wallets;

/// User wallet for one coin. A phone owns at most one wallet per coin.
#[derive(Debug, Queryable, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub user_phone: Phone,
    pub coin_id: CoinId,
    pub address: BlockchainAddress,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Default for Wallet {
    fn default() -> Self {
        let now = ::chrono::Utc::now().naive_utc();
        Self {
            id: WalletId::generate(),
            user_phone: Phone::new("+79000000000".to_string()),
            coin_id: CoinId::default(),
            address: BlockchainAddress::default(),
            name: "wallet".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[table_name = "wallets"]
pub struct NewWallet {
    pub id: WalletId,
    pub user_phone: Phone,
    pub coin_id: CoinId,
    pub address: BlockchainAddress,
    pub name: String,
}

#[derive(Debug, Validate, Clone, Serialize, Deserialize)]
pub struct CreateWallet {
    pub user_phone: Phone,
    pub coin: CoinSymbol,
    #[validate(length(min = "1", max = "40", message = "Name must not be empty "))]
    pub name: String,
}

impl CreateWallet {
    /// Validates both the name and the phone, reporting all problems together
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Some(error) = self.user_phone.validation_error() {
            errors.add("user_phone", error);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<(CreateWallet, CoinId, BlockchainAddress)> for NewWallet {
    fn from(req: (CreateWallet, CoinId, BlockchainAddress)) -> Self {
        let (input, coin_id, address) = req;
        Self {
            id: WalletId::generate(),
            user_phone: input.user_phone,
            coin_id,
            address,
            name: input.name,
        }
    }
}

/// Wallet balance as the user sees it: on-chain balance of the wallet address plus its internal ledger net sum
#[derive(Debug, Clone, Serialize)]
pub struct WalletBalance {
    pub wallet_id: WalletId,
    pub coin: CoinSymbol,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiatBalance {
    pub wallet_id: WalletId,
    pub coin: CoinSymbol,
    pub currency: FiatSymbol,
    pub balance: Amount,
    pub fiat_balance: Amount,
}
