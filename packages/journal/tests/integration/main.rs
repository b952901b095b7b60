
mod gc;
mod media;
mod scenarios;
mod storage;
mod transfer;
